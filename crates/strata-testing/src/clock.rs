use std::cell::Cell;
use std::time::Duration;

use strata_core::Clock;

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: Cell<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Duration) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}
