//! Diagnostics for the crate itself: subscriber setup and timing.

mod subscriber;
mod timer;

pub use subscriber::{init_tracing, LogFormat};
pub use timer::OperationTimer;
