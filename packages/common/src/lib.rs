pub mod error;
pub mod event_loop;
pub mod result;

pub use error::*;
pub use event_loop::*;
pub use result::*;
