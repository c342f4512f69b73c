//! Clock abstraction
//!
//! Epochs and ledger timestamps are derived from a `Clock` so that tests can
//! pin the current instant.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of the current UTC instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::{epoch_at, epoch_reference};

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::new(epoch_reference());
        assert_eq!(epoch_at(clock.now()), 1);

        clock.advance(Duration::days(7));
        assert_eq!(epoch_at(clock.now()), 2);

        clock.set(epoch_reference() - Duration::hours(1));
        assert_eq!(epoch_at(clock.now()), 0);
    }
}
