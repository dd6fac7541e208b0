use crate::error::LoopError;

/// Result type for event loop operations
pub type LoopResult<T> = Result<T, LoopError>;
