use std::cell::Cell;
use std::time::Instant;

use super::{CalendarTime, Epoch, TimeError};

pub trait Monotonic {
    fn millis(&self) -> u64;
}

pub struct SystemMonotonic {
    start: Instant,
}

impl SystemMonotonic {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemMonotonic {
    fn default() -> Self {
        Self::new()
    }
}

impl Monotonic for SystemMonotonic {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Default)]
pub struct ManualMonotonic {
    now: Cell<u64>,
}

impl ManualMonotonic {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Monotonic for ManualMonotonic {
    fn millis(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpochClock {
    base: Epoch,
    base_ms: u64,
}

impl EpochClock {
    pub fn new(start: CalendarTime, now_ms: u64) -> Result<Self, TimeError> {
        Ok(Self {
            base: Epoch::from_calendar(start)?,
            base_ms: now_ms,
        })
    }

    pub fn set_now(&mut self, cal: CalendarTime, now_ms: u64) -> Result<(), TimeError> {
        self.base = Epoch::from_calendar(cal)?;
        self.base_ms = now_ms;
        Ok(())
    }

    pub fn now(&self, now_ms: u64) -> Epoch {
        let elapsed_ms = now_ms.saturating_sub(self.base_ms);
        self.base.plus_days(elapsed_ms as f64 / 1000.0 / super::SECONDS_PER_DAY)
    }

    pub fn calendar(&self, now_ms: u64) -> CalendarTime {
        self.now(now_ms).to_calendar()
    }

    pub fn decimal_year(&self, now_ms: u64) -> f64 {
        let now = self.now(now_ms);
        let year = now.to_calendar().year;
        let jan1 = Epoch::from_calendar(CalendarTime::new(year, 1, 1, 0, 0, 0))
            .unwrap_or_else(|_| Epoch::year_start(year).plus_days(1.0));
        let days_in_year = if year % 4 == 0 { 366.0 } else { 365.0 };
        year as f64 + (now - jan1) / days_in_year
    }
}
