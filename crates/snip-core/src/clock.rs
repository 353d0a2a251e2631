use jiff::Timestamp;

/// Source of the current time.
///
/// Everything that reasons about creation times, expiry or rate-limit
/// windows reads time through this trait so tests can drive it.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::Clock;
    use jiff::{SignedDuration, Timestamp};
    use std::sync::{Arc, Mutex};

    /// A clock that only moves when told to.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<Timestamp>>,
    }

    impl ManualClock {
        pub fn new(now: Timestamp) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        /// Moves the clock forward (or backward, for negative durations).
        pub fn advance(&self, by: SignedDuration) {
            let mut now = self
                .now
                .lock()
                .expect("manual clock lock should not be poisoned");
            *now = *now + by;
        }

        pub fn set(&self, to: Timestamp) {
            *self
                .now
                .lock()
                .expect("manual clock lock should not be poisoned") = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self
                .now
                .lock()
                .expect("manual clock lock should not be poisoned")
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;
