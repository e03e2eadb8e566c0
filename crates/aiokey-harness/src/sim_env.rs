//! Virtual clock.
//!
//! Sleeping advances the clock instantly and records the requested duration,
//! so retry intervals can be asserted without waiting for them.

use std::{
    future::Future,
    ops::Sub,
    sync::{Arc, Mutex},
    time::Duration,
};

use aiokey_core::Environment;

/// Point on the virtual timeline, measured from simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(pub Duration);

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

#[derive(Default)]
struct Clock {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Deterministic [`Environment`] with a shared virtual clock.
///
/// Clones share the clock.
#[derive(Clone, Default)]
pub struct SimEnv {
    clock: Arc<Mutex<Clock>>,
}

impl SimEnv {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clock.now += duration;
    }

    /// Every duration passed to [`Environment::sleep`], in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner).sleeps.clone()
    }

    /// Time elapsed since simulation start.
    pub fn elapsed(&self) -> Duration {
        self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner).now
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        {
            let mut clock = self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            clock.now += duration;
            clock.sleeps.push(duration);
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_advances_and_records() {
        let env = SimEnv::new();
        let start = env.now();

        env.sleep(Duration::from_millis(100)).await;
        env.sleep(Duration::from_millis(100)).await;

        assert_eq!(env.now() - start, Duration::from_millis(200));
        assert_eq!(env.sleeps(), vec![Duration::from_millis(100); 2]);
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let other = env.clone();

        other.advance(Duration::from_secs(3));

        assert_eq!(env.elapsed(), Duration::from_secs(3));
        assert!(env.sleeps().is_empty());
    }
}
