use thiserror::Error;

/// Errors raised while driving the event loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("Event loop did not settle after {limit} callbacks (runaway scheduling?)")]
    Runaway { limit: usize },
}

impl LoopError {
    pub fn runaway(limit: usize) -> Self {
        Self::Runaway { limit }
    }
}
