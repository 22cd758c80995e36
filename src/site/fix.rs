use crate::time::CalendarTime;

pub const STALE_FIX_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub utc: CalendarTime,
    pub age_ms: u64,
    pub hdop: f64,
    pub satellites: u32,
}

impl Fix {
    pub fn is_stale(&self) -> bool {
        self.age_ms > STALE_FIX_MS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceUpdate {
    NoLock,
    Fix(Fix),
}

pub trait FixSource {
    fn poll(&mut self) -> Option<SourceUpdate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    #[default]
    NotFound,
    NoLock,
    Locked,
}
