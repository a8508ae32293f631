//! Wall-clock timing for instrumented operations.

use std::time::Instant;

/// Measures how long an operation takes.
#[derive(Debug, Clone)]
pub struct OperationTimer {
    start: Instant,
    operation: String,
}

impl OperationTimer {
    /// Starts timing `operation`.
    #[must_use]
    pub fn start(operation: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
