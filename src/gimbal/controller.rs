use crate::control::report::{Level, ValueWriter};
use crate::gimbal::axis::{az_distance, MotorAxis};
use crate::gimbal::calibration::CalibrationStep;
use crate::gimbal::error::GimbalError;
use crate::gimbal::hardware::{Orientation, OrientationSensor, ServoDriver};
use crate::gimbal::store::{AxisLimits, LimitStore, PulseLimits};

pub const UPDATE_PERIOD_MS: u64 = 500;
pub const SETTLE_DEG: f64 = 5.0;
/// Share of each axis's travel swung during calibration. Physical motion over
/// this swing must stay under 180 degrees for azimuth to be measured correctly.
pub const CALIBRATION_FRACTION: f64 = 0.333;

const MIN_RESCALE_MOVE_DEG: f64 = 30.0;
const MAX_RESCALE_CHANGE: f64 = 0.1;

pub const AXIS_COUNT: usize = 2;

/// Decides where an azimuth axis pinned at a travel limit goes instead of
/// following the error. `None` lets the normal correction run.
pub type LimitEscape = fn(&MotorAxis) -> Option<f64>;

pub fn swing_to_opposite_side(axis: &MotorAxis) -> Option<f64> {
    if axis.at_min {
        Some(axis.at_fraction(0.8))
    } else if axis.at_max {
        Some(axis.at_fraction(0.2))
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GimbalEvent {
    Calibrated { azimuth_axis: usize },
}

pub struct Gimbal {
    driver: Option<Box<dyn ServoDriver>>,
    store: Box<dyn LimitStore>,
    axes: [MotorAxis; AXIS_COUNT],
    step: CalibrationStep,
    azimuth_axis: usize,
    last_update_ms: Option<u64>,
    previous_fast: Option<Orientation>,
    previous_stop: Option<Orientation>,
    escape: LimitEscape,
}

impl Gimbal {
    pub fn new(
        driver: Option<Box<dyn ServoDriver>>,
        channels: [u8; AXIS_COUNT],
        store: Box<dyn LimitStore>,
    ) -> Self {
        let limits = store.load().unwrap_or_else(|e| {
            log::warn!("Using zero pulse limits: {}", e);
            PulseLimits::default()
        });
        let axes = [0, 1].map(|i| {
            let AxisLimits { min, max } = limits.axes[i];
            MotorAxis::new(channels[i], min, max)
        });

        match driver {
            Some(_) => log::info!("Servo controller found"),
            None => log::warn!("Servo controller not found"),
        }

        Self {
            driver,
            store,
            axes,
            step: CalibrationStep::default(),
            azimuth_axis: 0,
            last_update_ms: None,
            previous_fast: None,
            previous_stop: None,
            escape: swing_to_opposite_side,
        }
    }

    pub fn with_limit_escape(mut self, escape: LimitEscape) -> Self {
        self.escape = escape;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    pub fn is_calibrated(&self) -> bool {
        self.step.is_calibrated()
    }

    pub fn calibration_step(&self) -> CalibrationStep {
        self.step
    }

    pub fn axes(&self) -> &[MotorAxis; AXIS_COUNT] {
        &self.axes
    }

    pub fn azimuth_axis(&self) -> usize {
        self.azimuth_axis
    }

    fn elevation_axis(&self) -> usize {
        1 - self.azimuth_axis
    }

    /// One control cycle toward `target`, at most once per update period and
    /// only once the sensor has settled. Runs calibration until calibrated.
    pub fn move_to_az_el(
        &mut self,
        now_ms: u64,
        target: Orientation,
        sensor: &mut dyn OrientationSensor,
        declination_deg: f64,
    ) -> Result<Option<GimbalEvent>, GimbalError> {
        if self.driver.is_none() {
            return Ok(None);
        }
        if let Some(last) = self.last_update_ms {
            if now_ms.saturating_sub(last) < UPDATE_PERIOD_MS {
                return Ok(None);
            }
        }
        self.last_update_ms = Some(now_ms);

        let reading = sensor.orientation(declination_deg)?;

        let settled = self.previous_fast.is_some_and(|prev| {
            az_distance(prev.azimuth_deg, reading.azimuth_deg).abs() < SETTLE_DEG
                && (reading.elevation_deg - prev.elevation_deg).abs() < SETTLE_DEG
        });
        self.previous_fast = Some(reading);

        if !settled {
            return Ok(None);
        }

        let event = if self.is_calibrated() {
            self.seek(target, reading)?;
            None
        } else {
            self.calibrate(reading)?
        };
        self.previous_stop = Some(reading);
        Ok(event)
    }

    fn calibrate(&mut self, reading: Orientation) -> Result<Option<GimbalEvent>, GimbalError> {
        let step = self.step;
        self.step = step.next();
        log::debug!("Calibration step {} ({})", step.ordinal(), step);

        match step {
            CalibrationStep::MoveToStart => {
                let start = (1.0 - CALIBRATION_FRACTION) / 2.0;
                for i in 0..AXIS_COUNT {
                    let pulse = self.axes[i].at_fraction(start);
                    self.command(i, pulse)?;
                }
            }
            CalibrationStep::SwingFirstAxis => {
                self.swing(0)?;
            }
            CalibrationStep::MeasureFirstAxis => {
                self.measure(0, reading);
                self.swing(1)?;
            }
            CalibrationStep::MeasureSecondAxis => {
                self.measure(1, reading);
                self.azimuth_axis = if self.axes[0].az_scale.abs() < self.axes[1].az_scale.abs() {
                    0
                } else {
                    1
                };
                let az = &self.axes[self.azimuth_axis];
                let el = &self.axes[self.elevation_axis()];
                log::info!(
                    "Calibrated: azimuth axis {} ({:.2} µs/°), elevation axis {} ({:.2} µs/°)",
                    self.azimuth_axis + 1,
                    az.az_scale,
                    self.elevation_axis() + 1,
                    el.el_scale
                );
                return Ok(Some(GimbalEvent::Calibrated {
                    azimuth_axis: self.azimuth_axis,
                }));
            }
            CalibrationStep::Calibrated => {}
        }
        Ok(None)
    }

    fn swing(&mut self, axis: usize) -> Result<(), GimbalError> {
        let pulse = self.axes[axis].position as f64 + CALIBRATION_FRACTION * self.axes[axis].range();
        self.command(axis, pulse)
    }

    fn measure(&mut self, axis: usize, reading: Orientation) {
        let Some(before) = self.previous_stop else {
            return;
        };
        let pulses = CALIBRATION_FRACTION * self.axes[axis].range();
        let az_moved = az_distance(before.azimuth_deg, reading.azimuth_deg);
        let el_moved = reading.elevation_deg - before.elevation_deg;

        let motor = &mut self.axes[axis];
        motor.az_scale = pulses_per_degree(pulses, az_moved);
        motor.el_scale = pulses_per_degree(pulses, el_moved);
        log::info!(
            "Axis {} moved {:.1}° az, {:.1}° el for {:.0} µs: {:.2} µs/° az, {:.2} µs/° el",
            axis + 1,
            az_moved,
            el_moved,
            pulses,
            motor.az_scale,
            motor.el_scale
        );
    }

    fn seek(&mut self, target: Orientation, reading: Orientation) -> Result<(), GimbalError> {
        let az_err = az_distance(reading.azimuth_deg, target.azimuth_deg);
        let el_err = target.elevation_deg - reading.elevation_deg;
        let (az_i, el_i) = (self.azimuth_axis, self.elevation_axis());

        if let Some(before) = self.previous_stop {
            let az_moved = az_distance(before.azimuth_deg, reading.azimuth_deg);
            let axis = &mut self.axes[az_i];
            if let Some(scale) = rescale(axis.last_delta, az_moved, axis.az_scale) {
                log::info!("Azimuth scale {:.2} -> {:.2}", axis.az_scale, scale);
                axis.az_scale = scale;
            }
            let el_moved = reading.elevation_deg - before.elevation_deg;
            let axis = &mut self.axes[el_i];
            if let Some(scale) = rescale(axis.last_delta, el_moved, axis.el_scale) {
                log::info!("Elevation scale {:.2} -> {:.2}", axis.el_scale, scale);
                axis.el_scale = scale;
            }
        }

        let az_axis = &self.axes[az_i];
        let az_pulse = (self.escape)(az_axis)
            .unwrap_or(az_axis.position as f64 + az_err * az_axis.az_scale);
        self.command(az_i, az_pulse)?;

        let el_axis = &self.axes[el_i];
        let el_pulse = el_axis.position as f64 + el_err * el_axis.el_scale;
        self.command(el_i, el_pulse)
    }

    fn command(&mut self, axis: usize, pulse: f64) -> Result<(), GimbalError> {
        let driver = self.driver.as_mut().ok_or(GimbalError::NoController)?;
        let motor = self.axes.get_mut(axis).ok_or(GimbalError::NoSuchAxis(axis))?;
        let position = motor.command(pulse);
        driver.set_pulse(motor.channel, position)?;
        Ok(())
    }

    pub fn set_position(&mut self, axis: usize, pulse: i64) -> Result<u16, GimbalError> {
        self.command(axis, pulse as f64)?;
        Ok(self.axes[axis].position)
    }

    pub fn set_limit(&mut self, axis: usize, kind: LimitKind, pulse: u16) -> Result<(), GimbalError> {
        if self.driver.is_none() {
            return Err(GimbalError::NoController);
        }
        let motor = self.axes.get_mut(axis).ok_or(GimbalError::NoSuchAxis(axis))?;
        match kind {
            LimitKind::Min => motor.min = pulse,
            LimitKind::Max => motor.max = pulse,
        }
        let limits = PulseLimits {
            axes: [0, 1].map(|i| AxisLimits {
                min: self.axes[i].min,
                max: self.axes[i].max,
            }),
        };
        self.store.save(&limits)
    }

    pub fn write_report(&self, w: &mut ValueWriter) {
        if !self.is_connected() {
            w.value("G_Status", "Not found!");
            return;
        }

        let commanded = self.step != CalibrationStep::MoveToStart;
        for (i, axis) in self.axes.iter().enumerate() {
            let n = i + 1;
            if commanded {
                w.value(&format!("G_Mot{}Pos", n), axis.position);
            } else {
                w.blank(&format!("G_Mot{}Pos", n));
            }
            w.value(&format!("G_Mot{}Min", n), axis.min);
            w.value(&format!("G_Mot{}Max", n), axis.max);
        }

        match self
            .axes
            .iter()
            .enumerate()
            .find_map(|(i, a)| a.limit_status().map(|s| (i + 1, s)))
        {
            Some((n, which)) => w.marked("G_Status", format_args!("{} at {}", n, which), Level::Warning),
            None => w.marked("G_Status", "Ok", Level::Good),
        }
    }
}

fn pulses_per_degree(pulses: f64, degrees: f64) -> f64 {
    if degrees.abs() < f64::EPSILON {
        f64::INFINITY
    } else {
        pulses / degrees
    }
}

fn rescale(last_delta: i32, moved_deg: f64, current: f64) -> Option<f64> {
    if moved_deg.abs() < MIN_RESCALE_MOVE_DEG {
        return None;
    }
    let revised = last_delta as f64 / moved_deg;
    (((revised - current) / current).abs() < MAX_RESCALE_CHANGE).then_some(revised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gimbal::error::HardwareError;
    use crate::gimbal::hardware::CalibrationQuality;
    use crate::gimbal::store::MemoryLimitStore;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct Mount {
        pulses: Rc<RefCell<[u16; 2]>>,
        az_axis: usize,
    }

    impl Mount {
        fn new(az_axis: usize) -> Self {
            Self {
                pulses: Rc::new(RefCell::new([1500, 1500])),
                az_axis,
            }
        }

        fn az(&self) -> f64 {
            let p = self.pulses.borrow()[self.az_axis] as f64;
            (100.0 + (p - 1000.0) * 0.25).rem_euclid(360.0)
        }

        fn el(&self) -> f64 {
            let p = self.pulses.borrow()[1 - self.az_axis] as f64;
            (p - 1000.0) * 0.09
        }
    }

    impl ServoDriver for Mount {
        fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), HardwareError> {
            self.pulses.borrow_mut()[channel as usize] = pulse_us;
            Ok(())
        }
    }

    impl OrientationSensor for Mount {
        fn orientation(&mut self, _: f64) -> Result<Orientation, HardwareError> {
            Ok(Orientation::new(self.az(), self.el()))
        }

        fn calibration(&mut self) -> Result<CalibrationQuality, HardwareError> {
            Ok(CalibrationQuality::default())
        }
    }

    fn limits() -> MemoryLimitStore {
        MemoryLimitStore::new(PulseLimits {
            axes: [AxisLimits { min: 1000, max: 2000 }; 2],
        })
    }

    fn gimbal(mount: &Mount) -> Gimbal {
        Gimbal::new(Some(Box::new(mount.clone())), [0, 1], Box::new(limits()))
    }

    fn calibrate(gimbal: &mut Gimbal, sensor: &mut Mount) -> (u64, Option<GimbalEvent>) {
        let mut now = 0;
        let target = Orientation::default();
        for _ in 0..40 {
            now += UPDATE_PERIOD_MS;
            if let Some(event) = gimbal.move_to_az_el(now, target, sensor, 0.0).unwrap() {
                return (now, Some(event));
            }
        }
        (now, None)
    }

    #[test]
    fn calibration_learns_scales_and_axis_roles() {
        for az_axis in [0, 1] {
            let mut mount = Mount::new(az_axis);
            let mut gimbal = gimbal(&mount);
            let (_, event) = calibrate(&mut gimbal, &mut mount);
            assert_eq!(event, Some(GimbalEvent::Calibrated { azimuth_axis: az_axis }));
            assert!(gimbal.is_calibrated());

            let az = &gimbal.axes()[az_axis];
            let el = &gimbal.axes()[1 - az_axis];
            // commanded swing of 333 µs truncates to whole pulses
            assert_abs_diff_eq!(az.az_scale, 4.0, epsilon = 0.02);
            assert_abs_diff_eq!(el.el_scale, 1.0 / 0.09, epsilon = 0.05);
            assert!(az.el_scale.is_infinite());
            assert!(el.az_scale.is_infinite());
        }
    }

    #[test]
    fn calibration_steps_only_advance() {
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        let mut last = gimbal.calibration_step();
        let mut now = 0;
        for _ in 0..30 {
            now += UPDATE_PERIOD_MS;
            gimbal
                .move_to_az_el(now, Orientation::default(), &mut mount, 0.0)
                .unwrap();
            assert!(gimbal.calibration_step() >= last);
            last = gimbal.calibration_step();
        }
        assert_eq!(last, CalibrationStep::Calibrated);
    }

    #[test]
    fn rate_limited_regardless_of_call_rate() {
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        let target = Orientation::default();
        // 100 calls within one update period act at most once
        for ms in 0..100 {
            gimbal.move_to_az_el(1_000 + ms, target, &mut mount, 0.0).unwrap();
        }
        gimbal.move_to_az_el(1_499, target, &mut mount, 0.0).unwrap();
        assert_eq!(gimbal.calibration_step(), CalibrationStep::MoveToStart);
        gimbal.move_to_az_el(1_500, target, &mut mount, 0.0).unwrap();
        assert_eq!(gimbal.calibration_step(), CalibrationStep::SwingFirstAxis);
    }

    #[test]
    fn seeks_toward_target() {
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        let (mut now, _) = calibrate(&mut gimbal, &mut mount);

        let target = Orientation::new(250.0, 45.0);
        for _ in 0..20 {
            now += UPDATE_PERIOD_MS;
            gimbal.move_to_az_el(now, target, &mut mount, 0.0).unwrap();
        }
        assert_abs_diff_eq!(mount.az(), 250.0, epsilon = 0.5);
        assert_abs_diff_eq!(mount.el(), 45.0, epsilon = 0.2);
    }

    #[test]
    fn pinned_azimuth_axis_swings_to_opposite_side() {
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        let (mut now, _) = calibrate(&mut gimbal, &mut mount);

        // azimuth 90 needs pulse 960: below the travel, so axis pins at min
        let target = Orientation::new(90.0, 20.0);
        let mut pinned = false;
        let mut swung = false;
        for _ in 0..10 {
            now += UPDATE_PERIOD_MS;
            gimbal.move_to_az_el(now, target, &mut mount, 0.0).unwrap();
            let pulse = mount.pulses.borrow()[0];
            if gimbal.axes()[0].at_min {
                pinned = true;
            } else if pinned && pulse == 1800 {
                swung = true;
                break;
            }
        }
        assert!(pinned && swung);
    }

    #[test]
    fn custom_escape_strategy_replaces_default() {
        fn stay(_: &MotorAxis) -> Option<f64> {
            None
        }
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount).with_limit_escape(stay);
        let (mut now, _) = calibrate(&mut gimbal, &mut mount);
        for _ in 0..10 {
            now += UPDATE_PERIOD_MS;
            gimbal
                .move_to_az_el(now, Orientation::new(90.0, 20.0), &mut mount, 0.0)
                .unwrap();
        }
        assert_eq!(mount.pulses.borrow()[0], 1000);
    }

    #[test]
    fn rescale_accepts_only_small_revisions() {
        assert_eq!(rescale(400, 20.0, 4.0), None);
        assert_eq!(rescale(124, 30.0, 4.0), Some(124.0 / 30.0));
        assert_eq!(rescale(150, 30.0, 4.0), None);
        assert_eq!(rescale(120, 30.0, f64::INFINITY), None);
    }

    #[test]
    fn absent_controller_is_inert() {
        let mut mount = Mount::new(0);
        let mut gimbal = Gimbal::new(None, [0, 1], Box::new(limits()));
        for i in 1..20 {
            let r = gimbal.move_to_az_el(i * UPDATE_PERIOD_MS, Orientation::default(), &mut mount, 0.0);
            assert!(matches!(r, Ok(None)));
        }
        assert_eq!(gimbal.calibration_step(), CalibrationStep::MoveToStart);
        assert!(matches!(gimbal.set_position(0, 1500), Err(GimbalError::NoController)));

        let mut w = ValueWriter::new();
        gimbal.write_report(&mut w);
        assert_eq!(w.finish(), "G_Status=Not found!\n");
    }

    #[test]
    fn limit_edits_are_persisted() {
        let mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        gimbal.set_limit(1, LimitKind::Max, 2100).unwrap();
        assert_eq!(gimbal.store.load().unwrap().axes[1].max, 2100);
        assert!(matches!(
            gimbal.set_limit(2, LimitKind::Min, 0),
            Err(GimbalError::NoSuchAxis(2))
        ));
    }

    #[test]
    fn report_shows_positions_after_first_command() {
        let mut mount = Mount::new(0);
        let mut gimbal = gimbal(&mount);
        let mut w = ValueWriter::new();
        gimbal.write_report(&mut w);
        assert!(w.as_str().starts_with("G_Mot1Pos=\nG_Mot1Min=1000\nG_Mot1Max=2000\n"));

        gimbal.set_position(1, 5000).unwrap();
        gimbal.move_to_az_el(500, Orientation::default(), &mut mount, 0.0).unwrap();
        gimbal.move_to_az_el(1000, Orientation::default(), &mut mount, 0.0).unwrap();
        let mut w = ValueWriter::new();
        gimbal.write_report(&mut w);
        let text = w.finish();
        assert!(text.contains("G_Mot1Pos=1333\n"));
        assert!(text.contains("G_Status=Ok+\n"));

        gimbal.set_position(1, 5000).unwrap();
        let mut w = ValueWriter::new();
        gimbal.write_report(&mut w);
        assert!(w.finish().contains("G_Status=2 at Max!\n"));
    }
}
