//! # Notification Bus
//!
//! Typed publish/subscribe with a capped invocation count per handler and
//! early-stop chains.
//!
//! ```text
//! trigger("update", args)
//!   ├─ select handlers for "update" (registration order)
//!   ├─ decrement remaining invocations, drop exhausted entries
//!   └─ schedule chain:  task 1 → h1(&args)
//!                       task 2 → h2(&args)   (skipped if h1 returned Stop)
//!                       ...
//!                       done()
//! ```
//!
//! Selection happens synchronously inside `trigger`. Handlers run one per event
//! loop task, so two chains started in the same task interleave in FIFO order.
//! Panics inside handlers are not caught.

use kontext_common::EventLoop;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Identifier returned by [`Bus::add`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Whether a notification chain continues after a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

type Handler<A> = Rc<dyn Fn(&A) -> Flow>;

struct Entry<A> {
    id: HandlerId,
    event_type: String,
    handler: Handler<A>,
    remaining: Option<usize>,
}

struct BusState<A> {
    entries: Vec<Entry<A>>,
    next_id: u64,
}

struct Chain<A> {
    event_type: String,
    handlers: Vec<Handler<A>>,
    args: A,
    done: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Shared handle to a notification bus carrying `A` as event payload
pub struct Bus<A: 'static> {
    state: Rc<RefCell<BusState<A>>>,
    event_loop: EventLoop,
}

impl<A: 'static> Clone for Bus<A> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            event_loop: self.event_loop.clone(),
        }
    }
}

impl<A: 'static> Bus<A> {
    pub fn new(event_loop: EventLoop) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                entries: Vec::new(),
                next_id: 0,
            })),
            event_loop,
        }
    }

    /// Register `handler` for `event_type`
    ///
    /// `invocations` caps how many triggers the handler takes part in; `None` (or
    /// zero) means unlimited. A handler returning `false` stops the current chain.
    pub fn add<F, R>(&self, event_type: &str, handler: F, invocations: Option<usize>) -> HandlerId
    where
        F: Fn(&A) -> R + 'static,
        R: Into<Flow>,
    {
        let mut state = self.state.borrow_mut();
        let id = HandlerId(state.next_id);
        state.next_id += 1;
        state.entries.push(Entry {
            id,
            event_type: event_type.to_string(),
            handler: Rc::new(move |args: &A| -> Flow { handler(args).into() }),
            remaining: invocations.filter(|n| *n > 0),
        });
        id
    }

    /// Remove every entry matching both filters; `None` matches anything
    pub fn remove(&self, event_type: Option<&str>, id: Option<HandlerId>) -> Vec<HandlerId> {
        let mut state = self.state.borrow_mut();
        let mut removed = Vec::new();
        state.entries.retain(|entry| {
            let type_matches = event_type.map_or(true, |t| t == "*" || entry.event_type == t);
            let id_matches = id.map_or(true, |id| entry.id == id);
            if type_matches && id_matches {
                removed.push(entry.id);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Registered handlers for `event_type`; `None` or `"*"` lists everything
    pub fn list(&self, event_type: Option<&str>) -> Vec<HandlerId> {
        self.state
            .borrow()
            .entries
            .iter()
            .filter(|entry| match event_type {
                None | Some("*") => true,
                Some(t) => entry.event_type == t,
            })
            .map(|entry| entry.id)
            .collect()
    }

    /// Notify every handler of `event_type` with `args`, one handler per task
    pub fn trigger(&self, event_type: &str, args: A, done: Option<Box<dyn FnOnce()>>) {
        let handlers = {
            let mut state = self.state.borrow_mut();
            let mut selected = Vec::new();
            for entry in state.entries.iter_mut() {
                if entry.event_type != event_type {
                    continue;
                }
                if let Some(remaining) = entry.remaining.as_mut() {
                    *remaining -= 1;
                }
                selected.push(Rc::clone(&entry.handler));
            }
            state.entries.retain(|entry| entry.remaining != Some(0));
            selected
        };

        if handlers.is_empty() && done.is_none() {
            return;
        }

        trace!(event_type, handlers = handlers.len(), "Triggering chain");
        let chain = Rc::new(Chain {
            event_type: event_type.to_string(),
            handlers,
            args,
            done: RefCell::new(done),
        });
        schedule_step(self.event_loop.clone(), chain, 0);
    }
}

fn schedule_step<A: 'static>(event_loop: EventLoop, chain: Rc<Chain<A>>, index: usize) {
    let next_loop = event_loop.clone();
    event_loop.schedule(move || {
        let Some(handler) = chain.handlers.get(index) else {
            finish(&chain);
            return;
        };
        match handler(&chain.args) {
            Flow::Continue => schedule_step(next_loop, chain, index + 1),
            Flow::Stop => {
                trace!(event_type = %chain.event_type, index, "Chain stopped");
                finish(&chain);
            }
        }
    });
}

fn finish<A>(chain: &Chain<A>) {
    let done = chain.done.borrow_mut().take();
    if let Some(done) = done {
        done();
    }
}

impl<A: 'static> fmt::Debug for Bus<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Bus")
                .field("handlers", &state.entries.len())
                .finish(),
            Err(_) => f.write_str("Bus(<busy>)"),
        }
    }
}
