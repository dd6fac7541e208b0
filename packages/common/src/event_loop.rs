//! # Event Loop
//!
//! A cooperative, single-threaded scheduler with two queues:
//!
//! - **tasks**: FIFO callbacks, the equivalent of a zero-delay timer. Notification
//!   chains advance one handler per task so that re-entrant triggers never grow the
//!   stack and always run in a deterministic order.
//! - **frames**: callbacks requested for the next animation frame. Everything
//!   requested before a frame starts runs in that frame; callbacks requested while
//!   the frame runs wait for the following one.
//!
//! The loop never runs on its own. The host drives it with [`EventLoop::tick`],
//! [`EventLoop::run_tasks`], [`EventLoop::run_frame`] or
//! [`EventLoop::run_until_idle`].
//!
//! No borrow of the internal state is held while a callback executes, so callbacks
//! may freely schedule more work.

use crate::error::LoopError;
use crate::result::LoopResult;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Default ceiling on callbacks executed by a single `run_*` call
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

type Task = Box<dyn FnOnce()>;

struct LoopState {
    tasks: VecDeque<Task>,
    frames: Vec<Task>,
    max_iterations: usize,
    frame_count: u64,
}

/// Shared handle to a cooperative event loop
#[derive(Clone)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_max_iterations(DEFAULT_MAX_ITERATIONS)
    }

    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoopState {
                tasks: VecDeque::new(),
                frames: Vec::new(),
                max_iterations,
                frame_count: 0,
            })),
        }
    }

    pub fn set_max_iterations(&self, max_iterations: usize) {
        self.state.borrow_mut().max_iterations = max_iterations;
    }

    /// Queue a task behind everything already scheduled
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.state.borrow_mut().tasks.push_back(Box::new(task));
    }

    /// Queue a callback for the next animation frame
    pub fn request_frame(&self, callback: impl FnOnce() + 'static) {
        self.state.borrow_mut().frames.push(Box::new(callback));
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.tasks.is_empty() && state.frames.is_empty()
    }

    /// Number of frames run so far
    pub fn frame_count(&self) -> u64 {
        self.state.borrow().frame_count
    }

    /// Run a single task. Returns `false` when the task queue was empty.
    pub fn tick(&self) -> bool {
        let task = self.state.borrow_mut().tasks.pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drain the task queue, including tasks scheduled while draining
    ///
    /// Fails once `max_iterations` tasks have run and another is still queued.
    pub fn run_tasks(&self) -> LoopResult<usize> {
        let limit = self.state.borrow().max_iterations;
        let mut executed = 0;
        while self.pending_tasks() > 0 {
            if executed >= limit {
                return Err(LoopError::runaway(limit));
            }
            self.tick();
            executed += 1;
        }
        Ok(executed)
    }

    /// Run every frame callback requested before this call
    pub fn run_frame(&self) -> usize {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            state.frame_count += 1;
            std::mem::take(&mut state.frames)
        };
        let count = callbacks.len();
        trace!(callbacks = count, "Running animation frame");
        for callback in callbacks {
            callback();
        }
        count
    }

    /// Alternate tasks and frames until both queues are empty
    pub fn run_until_idle(&self) -> LoopResult<usize> {
        let limit = self.state.borrow().max_iterations;
        let mut executed = 0;
        loop {
            executed += self.run_tasks()?;
            if self.pending_frames() == 0 {
                break;
            }
            executed += self.run_frame();
            if executed >= limit && !self.is_idle() {
                return Err(LoopError::runaway(limit));
            }
        }
        Ok(executed)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("tasks", &state.tasks.len())
            .field("frames", &state.frames.len())
            .field("frame_count", &state.frame_count)
            .finish()
    }
}
