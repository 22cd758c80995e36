use crate::control::report::{Level, ValueWriter};
use crate::gimbal::error::HardwareError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl Orientation {
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationQuality {
    pub system: u8,
    pub gyro: u8,
    pub accel: u8,
    pub mag: u8,
}

impl CalibrationQuality {
    pub fn is_usable(&self) -> bool {
        self.system >= 1 && self.gyro >= 1 && self.accel >= 1 && self.mag >= 1
    }
}

pub trait ServoDriver {
    fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), HardwareError>;
}

pub trait OrientationSensor {
    fn orientation(&mut self, declination_deg: f64) -> Result<Orientation, HardwareError>;

    fn calibration(&mut self) -> Result<CalibrationQuality, HardwareError>;
}

pub fn write_sensor_report(
    sensor: Option<&mut (dyn OrientationSensor + '_)>,
    declination_deg: f64,
    w: &mut ValueWriter,
) {
    let Some(sensor) = sensor else {
        w.value("SS_Status", "Not found!");
        return;
    };

    match sensor.orientation(declination_deg) {
        Ok(o) => {
            w.value("SS_Az", format_args!("{:.2}", o.azimuth_deg));
            w.value("SS_El", format_args!("{:.2}", o.elevation_deg));
        }
        Err(e) => {
            log::warn!("Sensor read failed: {}", e);
            w.unknown("SS_Az");
            w.unknown("SS_El");
        }
    }

    match sensor.calibration() {
        Ok(q) => {
            if q.is_usable() {
                w.marked("SS_Status", "Ok", Level::Good);
            } else {
                w.marked("SS_Status", "Uncalibrated", Level::Warning);
            }
            w.value("SS_SStatus", q.system);
            w.value("SS_GStatus", q.gyro);
            w.value("SS_MStatus", q.mag);
            w.value("SS_AStatus", q.accel);
        }
        Err(e) => {
            log::warn!("Sensor calibration read failed: {}", e);
            w.marked("SS_Status", "Read error", Level::Warning);
        }
    }
}
