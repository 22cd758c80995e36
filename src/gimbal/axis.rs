pub fn az_distance(from: f64, to: f64) -> f64 {
    let d = to - from;
    if d < -180.0 {
        d + 360.0
    } else if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotorAxis {
    pub channel: u8,
    pub min: u16,
    pub max: u16,
    pub position: u16,
    pub last_delta: i32,
    pub at_min: bool,
    pub at_max: bool,
    pub az_scale: f64,
    pub el_scale: f64,
}

impl MotorAxis {
    pub fn new(channel: u8, min: u16, max: u16) -> Self {
        Self {
            channel,
            min,
            max,
            position: 0,
            last_delta: 0,
            at_min: false,
            at_max: false,
            az_scale: 0.0,
            el_scale: 0.0,
        }
    }

    pub fn range(&self) -> f64 {
        self.max as f64 - self.min as f64
    }

    pub fn at_fraction(&self, fraction: f64) -> f64 {
        self.min as f64 + fraction * self.range()
    }

    /// Clamp a requested pulse into the limits, flagging which limit was hit.
    /// Landing exactly on a limit counts as hitting it. Returns the new position.
    pub fn command(&mut self, requested: f64) -> u16 {
        // truncation toward zero, saturating
        let requested = requested as i64;
        let mut pulse = requested;

        self.at_min = pulse <= self.min as i64;
        if self.at_min {
            pulse = self.min as i64;
        }
        self.at_max = pulse >= self.max as i64;
        if self.at_max {
            pulse = self.max as i64;
        }

        let pulse = pulse.clamp(0, u16::MAX as i64) as u16;
        self.last_delta = pulse as i32 - self.position as i32;
        self.position = pulse;
        pulse
    }

    pub fn limit_status(&self) -> Option<&'static str> {
        if self.at_min {
            Some("Min")
        } else if self.at_max {
            Some("Max")
        } else {
            None
        }
    }
}
