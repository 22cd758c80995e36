use heapless::Vec as FixedVec;
use serde::Serialize;

use crate::time::Epoch;

pub const SKY_PATH_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonEvent {
    pub time: Epoch,
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitEvent {
    pub time: Epoch,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassEvents {
    pub rise: Option<HorizonEvent>,
    pub transit: Option<TransitEvent>,
    pub set: Option<HorizonEvent>,
}

impl PassEvents {
    pub fn is_complete(&self) -> bool {
        self.rise.is_some() && self.transit.is_some() && self.set.is_some()
    }

    pub fn is_up(&self) -> bool {
        match (self.rise, self.set) {
            (Some(rise), Some(set)) => set.time < rise.time,
            _ => false,
        }
    }

    pub fn is_stale(&self, now: Epoch) -> bool {
        let passed = |event: Option<HorizonEvent>| event.is_some_and(|e| e.time < now);
        passed(self.rise) || passed(self.set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyPoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

pub type SkyPath = FixedVec<SkyPoint, SKY_PATH_POINTS>;
