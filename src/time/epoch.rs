use std::ops::Sub;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use super::TimeError;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

const MIN_YEAR: i32 = 1901;
const MAX_YEAR: i32 = 2099;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Epoch {
    day_number: i64,
    day_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    pub fn validate(&self) -> Result<(), TimeError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(TimeError::YearOutOfRange(self.year));
        }
        if NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_none() {
            return Err(TimeError::InvalidDate {
                year: self.year,
                month: self.month,
                day: self.day,
            });
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(TimeError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
                second: self.second,
            });
        }
        Ok(())
    }

    fn with_second(mut self, second: u32) -> Self {
        self.second = second;
        self
    }
}

impl From<NaiveDateTime> for CalendarTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

impl Epoch {
    pub fn new(day_number: i64, day_fraction: f64) -> Self {
        let mut epoch = Self {
            day_number,
            day_fraction: 0.0,
        };
        epoch.add_days(day_fraction);
        epoch
    }

    pub fn from_calendar(cal: CalendarTime) -> Result<Self, TimeError> {
        cal.validate()?;
        let day_number = day_number(cal.year, cal.month, cal.day as i64);
        let seconds = cal.hour * 3600 + cal.minute * 60 + cal.second;
        Ok(Self {
            day_number,
            day_fraction: seconds as f64 / SECONDS_PER_DAY,
        })
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Result<Self, TimeError> {
        let mut epoch = Self::from_calendar(CalendarTime::from(dt).with_second(0))?;
        let seconds = dt.second() as f64 + dt.nanosecond() as f64 * 1e-9;
        epoch.add_days(seconds / SECONDS_PER_DAY);
        Ok(epoch)
    }

    /// Midnight starting "January 0" of `year`, the origin for day-of-year element epochs.
    pub fn year_start(year: i32) -> Self {
        Self {
            day_number: day_number(year, 1, 0),
            day_fraction: 0.0,
        }
    }

    pub fn day_number(&self) -> i64 {
        self.day_number
    }

    pub fn day_fraction(&self) -> f64 {
        self.day_fraction
    }

    pub fn to_calendar(&self) -> CalendarTime {
        let mut dn = self.day_number;
        let mut secs = (self.day_fraction * SECONDS_PER_DAY).round() as u32;
        if secs >= SECONDS_PER_DAY as u32 {
            secs -= SECONDS_PER_DAY as u32;
            dn += 1;
        }
        let (year, month, day) = calendar_date(dn);
        CalendarTime {
            year,
            month,
            day,
            hour: secs / 3600,
            minute: secs / 60 % 60,
            second: secs % 60,
        }
    }

    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let (year, month, day) = calendar_date(self.day_number);
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let millis = (self.day_fraction * SECONDS_PER_DAY * 1000.0).round() as i64;
        Some(date.and_hms_opt(0, 0, 0)? + chrono::Duration::milliseconds(millis))
    }

    pub fn add_seconds(&mut self, seconds: i64) {
        self.add_days(seconds as f64 / SECONDS_PER_DAY);
    }

    pub fn add_days(&mut self, days: f64) {
        let total = self.day_fraction + days;
        let whole = total.floor();
        self.day_number += whole as i64;
        self.day_fraction = total - whole;
        if self.day_fraction >= 1.0 {
            self.day_number += 1;
            self.day_fraction = 0.0;
        }
    }

    pub fn plus_seconds(mut self, seconds: i64) -> Self {
        self.add_seconds(seconds);
        self
    }

    pub fn plus_days(mut self, days: f64) -> Self {
        self.add_days(days);
        self
    }

    pub fn days_until(&self, later: &Epoch) -> f64 {
        *later - *self
    }

    pub fn as_days(&self) -> f64 {
        self.day_number as f64 + self.day_fraction
    }
}

impl Sub for Epoch {
    type Output = f64;

    fn sub(self, rhs: Epoch) -> f64 {
        (self.day_number - rhs.day_number) as f64 + (self.day_fraction - rhs.day_fraction)
    }
}

impl PartialOrd for Epoch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match self.day_number.cmp(&other.day_number) {
            std::cmp::Ordering::Equal => self.day_fraction.partial_cmp(&other.day_fraction),
            ord => Some(ord),
        }
    }
}

fn day_number(year: i32, month: u32, day: i64) -> i64 {
    let (mut y, mut m) = (year as i64, month as i64);
    if m < 3 {
        m += 12;
        y -= 1;
    }
    (y as f64 * 365.25) as i64 + ((m + 1) as f64 * 30.6) as i64 + day - 428
}

fn calendar_date(day_number: i64) -> (i32, u32, u32) {
    let mut dt = day_number + 428;
    let mut y = ((dt as f64 - 122.1) / 365.25) as i64;
    dt -= (y as f64 * 365.25) as i64;
    let mut m = (dt as f64 / 30.61) as i64;
    dt -= (m as f64 * 30.6) as i64;
    m -= 1;
    if m > 12 {
        m -= 12;
        y += 1;
    }
    (y as i32, m as u32, dt as u32)
}
