use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::gimbal::{CalibrationQuality, HardwareError, Orientation, OrientationSensor, ServoDriver};
use crate::site::{FixSource, SourceUpdate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountGeometry {
    pub azimuth_channel: u8,
    pub azimuth_deg_per_us: f64,
    pub elevation_deg_per_us: f64,
    pub azimuth_at_center: f64,
    pub elevation_at_center: f64,
    pub center_us: u16,
    pub coupling_deg_per_us: f64,
}

impl Default for MountGeometry {
    fn default() -> Self {
        Self {
            azimuth_channel: 0,
            azimuth_deg_per_us: 0.2,
            elevation_deg_per_us: 0.1,
            azimuth_at_center: 180.0,
            elevation_at_center: 45.0,
            center_us: 1500,
            coupling_deg_per_us: 0.0,
        }
    }
}

#[derive(Debug)]
struct MountState {
    geometry: MountGeometry,
    pulses: [u16; 2],
}

/// Shared handle on one simulated mount. Clones drive and sense the same mount,
/// so one can go to the gimbal as its servo driver and another serve as sensor.
#[derive(Debug, Clone)]
pub struct SimulatedMount {
    state: Rc<RefCell<MountState>>,
}

impl SimulatedMount {
    pub fn new(geometry: MountGeometry) -> Self {
        Self {
            state: Rc::new(RefCell::new(MountState {
                geometry,
                pulses: [geometry.center_us; 2],
            })),
        }
    }

    pub fn pulses(&self) -> [u16; 2] {
        self.state.borrow().pulses
    }

    pub fn pointing(&self) -> Orientation {
        let state = self.state.borrow();
        let g = &state.geometry;
        let az_channel = usize::from(g.azimuth_channel.min(1));
        let offset = |channel: usize| state.pulses[channel] as f64 - g.center_us as f64;
        let az_offset = offset(az_channel);
        let el_offset = offset(1 - az_channel);

        Orientation::new(
            (g.azimuth_at_center
                + az_offset * g.azimuth_deg_per_us
                + el_offset * g.coupling_deg_per_us)
                .rem_euclid(360.0),
            (g.elevation_at_center + el_offset * g.elevation_deg_per_us).clamp(-90.0, 90.0),
        )
    }
}

impl ServoDriver for SimulatedMount {
    fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), HardwareError> {
        let mut state = self.state.borrow_mut();
        let slot = state
            .pulses
            .get_mut(usize::from(channel))
            .ok_or_else(|| HardwareError::Bus(format!("no servo on channel {}", channel)))?;
        *slot = pulse_us;
        Ok(())
    }
}

impl OrientationSensor for SimulatedMount {
    fn orientation(&mut self, _declination_deg: f64) -> Result<Orientation, HardwareError> {
        Ok(self.pointing())
    }

    fn calibration(&mut self) -> Result<CalibrationQuality, HardwareError> {
        Ok(CalibrationQuality {
            system: 3,
            gyro: 3,
            accel: 3,
            mag: 3,
        })
    }
}

#[derive(Debug, Default)]
pub struct ScriptedFixSource {
    script: VecDeque<SourceUpdate>,
}

impl ScriptedFixSource {
    pub fn new(script: impl IntoIterator<Item = SourceUpdate>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn push(&mut self, update: SourceUpdate) {
        self.script.push_back(update);
    }
}

impl FixSource for ScriptedFixSource {
    fn poll(&mut self) -> Option<SourceUpdate> {
        self.script.pop_front()
    }
}
