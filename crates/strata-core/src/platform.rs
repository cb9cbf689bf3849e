//! Platform abstraction traits for runtime services.
//!
//! These traits let the runtime delegate frame requests and time keeping to
//! the host, so the same scheduler drives a windowed event loop and a
//! deterministic test harness.

use std::time::Duration;

/// Schedules work for the runtime.
///
/// Implementations are responsible for waking the host so it pumps another
/// frame. They must be safe to use from multiple threads.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}

/// Provides logical time for the frame scheduler.
///
/// Clocks are owned by the single runtime thread.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Moves logical time forward. Wall clocks ignore this.
    fn advance(&self, _by: Duration) {}
}

/// Scheduler that never wakes anyone. Useful when the host polls.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}
