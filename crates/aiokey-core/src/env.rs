//! Environment abstraction for deterministic testing.
//!
//! Decouples the reconnect loop from the wall clock. The daemon sleeps on
//! the tokio timer; simulation advances a virtual clock instantly so retry
//! schedules can be asserted without waiting.

use std::{future::Future, ops::Sub, time::Duration};

/// Abstract environment providing time and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - after `sleep(d)` completes, `now()` has advanced by at least `d`
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type: `std::time::Instant` in production, virtual time in
    /// simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only the connection manager calls this, between connect attempts.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}
