use std::fmt;

use crate::control::report::{sexagesimal, Level, ValueWriter};
use crate::gimbal::Orientation;
use crate::predict::{
    compute_sky_path, doppler_shift_khz, eclipsed, find_next_pass, predict_sun, topocentric,
    ObserverFrame, OrbitalElements, PassEvents, PredictError, Satellite, SkyPath, TleSet,
    Topocentric,
};
use crate::time::Epoch;
use crate::tracker::error::TrackerError;
use crate::tracker::parsing::parse_tle_lines;

const ELEMENT_AGE_WARNING_DAYS: f64 = 10.0;
const MINUTE_IN_HOURS: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerReference {
    pub vhf_hz: f64,
    pub uhf_hz: f64,
}

impl Default for DopplerReference {
    fn default() -> Self {
        Self {
            vhf_hz: 144e6,
            uhf_hz: 440e6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub gimbal_connected: bool,
    pub gimbal_calibrated: bool,
    pub sensor_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingState {
    Off,
    Calibrating,
    Override,
    Elements(String),
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::Off => write!(f, "Tracking is off"),
            TrackingState::Calibrating => write!(f, "Calibrating gimbal motor scales!"),
            TrackingState::Override => write!(f, "Now tracking overridden Az and El+"),
            TrackingState::Elements(name) => write!(f, "Now tracking: {}+", name),
        }
    }
}

struct LoadedElements {
    tle: TleSet,
    satellite: Satellite,
    sunlit: bool,
}

enum Source {
    None,
    Elements(Box<LoadedElements>),
    Override,
}

pub struct Target {
    source: Source,
    look: Topocentric,
    events: PassEvents,
    sky_path: SkyPath,
    tracking: bool,
    doppler: DopplerReference,
}

impl Target {
    pub fn new(doppler: DopplerReference) -> Self {
        Self {
            source: Source::None,
            look: Topocentric::default(),
            events: PassEvents::default(),
            sky_path: SkyPath::new(),
            tracking: false,
            doppler,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.source, Source::Override)
    }

    pub fn elements(&self) -> Option<&OrbitalElements> {
        match &self.source {
            Source::Elements(loaded) => Some(loaded.satellite.elements()),
            _ => None,
        }
    }

    pub fn look(&self) -> &Topocentric {
        &self.look
    }

    pub fn pointing(&self) -> Orientation {
        Orientation::new(self.look.azimuth_deg, self.look.elevation_deg)
    }

    pub fn events(&self) -> &PassEvents {
        &self.events
    }

    pub fn sky_path(&self) -> &SkyPath {
        &self.sky_path
    }

    pub fn upload(
        &mut self,
        text: &str,
        now: Epoch,
        observer: &ObserverFrame,
    ) -> Result<String, TrackerError> {
        let result = parse_tle_lines(text).and_then(|tle| self.set_elements(tle, now, observer));
        if result.is_err() {
            self.drop_elements();
        }
        result
    }

    /// Follow a new element set. Tracking stops until requested again.
    /// Returns the set's name.
    pub fn set_elements(
        &mut self,
        tle: TleSet,
        now: Epoch,
        observer: &ObserverFrame,
    ) -> Result<String, TrackerError> {
        let elements = match OrbitalElements::from_tle(&tle) {
            Ok(elements) => elements,
            Err(e) => {
                self.drop_elements();
                return Err(e.into());
            }
        };
        log::info!(
            "Element set accepted for {} (catalog {})\n{}\n{}",
            tle.name,
            elements.catalog_number,
            tle.line1,
            tle.line2
        );

        let name = tle.name.clone();
        self.source = Source::Elements(Box::new(LoadedElements {
            tle,
            satellite: Satellite::new(elements),
            sunlit: true,
        }));
        self.tracking = false;
        self.update_topo(now, observer)?;
        self.refresh_pass(now, observer)?;
        Ok(name)
    }

    fn drop_elements(&mut self) {
        if let Source::Elements(_) = self.source {
            self.source = Source::None;
            self.events = PassEvents::default();
            self.sky_path.clear();
        }
    }

    pub fn override_azimuth(&mut self, azimuth_deg: f64) {
        self.look.azimuth_deg = azimuth_deg.rem_euclid(360.0);
        self.enter_override();
    }

    pub fn override_elevation(&mut self, elevation_deg: f64) {
        self.look.elevation_deg = elevation_deg.clamp(0.0, 90.0);
        self.enter_override();
    }

    fn enter_override(&mut self) {
        if !self.is_overridden() {
            log::info!("Target direction overridden");
        }
        self.source = Source::Override;
        self.events = PassEvents::default();
        self.sky_path.clear();
    }

    pub fn update_topo(&mut self, now: Epoch, observer: &ObserverFrame) -> Result<(), PredictError> {
        if let Source::Elements(loaded) = &mut self.source {
            let state = loaded.satellite.predict(now)?;
            loaded.sunlit = !eclipsed(&state, &predict_sun(now));
            self.look = topocentric(&state, observer);
        }
        Ok(())
    }

    pub fn refresh_pass(&mut self, now: Epoch, observer: &ObserverFrame) -> Result<(), PredictError> {
        match &self.source {
            Source::Elements(loaded) => {
                self.events = find_next_pass(&loaded.satellite, observer, now)?;
                self.sky_path = compute_sky_path(
                    &loaded.satellite,
                    observer,
                    now,
                    self.look.elevation_deg,
                    &self.events,
                )?;
            }
            _ => {
                self.events = PassEvents::default();
                self.sky_path.clear();
            }
        }
        Ok(())
    }

    /// Once the predicted rise or set is behind us, search again so "next"
    /// keeps meaning next. Returns whether a new search ran.
    pub fn refresh_if_boundary_crossed(
        &mut self,
        now: Epoch,
        observer: &ObserverFrame,
    ) -> Result<bool, PredictError> {
        if !self.events.is_stale(now) {
            return Ok(false);
        }
        self.update_topo(now, observer)?;
        self.refresh_pass(now, observer)?;
        Ok(true)
    }

    pub fn set_tracking_state(
        &mut self,
        want_on: bool,
        ready: Readiness,
    ) -> Result<TrackingState, TrackerError> {
        let outcome = if !want_on {
            Ok(TrackingState::Off)
        } else if !ready.gimbal_connected {
            Err(TrackerError::NoGimbal)
        } else if !ready.sensor_connected {
            Err(TrackerError::NoSensor)
        } else if !ready.gimbal_calibrated {
            Ok(TrackingState::Calibrating)
        } else {
            match &self.source {
                Source::Override => Ok(TrackingState::Override),
                Source::Elements(loaded) => Ok(TrackingState::Elements(loaded.tle.name.clone())),
                Source::None => Err(TrackerError::NoTarget),
            }
        };

        self.tracking = matches!(&outcome, Ok(state) if *state != TrackingState::Off);
        match &outcome {
            Ok(state) => log::info!("{}", state),
            Err(e) => log::warn!("{}", e),
        }
        outcome
    }

    pub fn write_report(&self, w: &mut ValueWriter, now: Epoch) {
        let overridden = self.is_overridden();

        if !matches!(self.source, Source::None) {
            let level = Level::warn_if(overridden);
            w.marked("T_Az", format_args!("{:.2}", self.look.azimuth_deg), level);
            w.marked("T_El", format_args!("{:.2}", self.look.elevation_deg), level);
        }

        match &self.source {
            Source::Elements(loaded) => {
                self.write_pass_report(w, loaded, now);
                w.value("T_TLE", &loaded.tle.name);
                w.line(&loaded.tle.line1);
                w.line(&loaded.tle.line2);
            }
            _ => {
                w.blank("T_TLE");
                w.line("");
                w.line("");
            }
        }

        if overridden {
            for name in [
                "T_Age",
                "T_Sunlit",
                "T_Range",
                "T_RangeR",
                "T_VHFDoppler",
                "T_UHFDoppler",
                "T_NextRise",
                "T_RiseAz",
                "T_NextTrans",
                "T_TransAz",
                "T_TransEl",
                "T_NextSet",
                "T_SetAz",
            ] {
                w.blank(name);
            }
        }

        match self.source {
            Source::None => w.marked("T_Status", "No target", Level::Warning),
            _ if self.look.elevation_deg > 0.0 => w.marked("T_Status", "Up", Level::Good),
            _ => w.value("T_Status", "Down"),
        }

        w.value("tracking", if self.tracking { "On" } else { "Off" });

        let path: String = self
            .sky_path
            .iter()
            .map(|p| format!("{:.2},{:.2};", p.azimuth_deg, p.elevation_deg))
            .collect();
        w.value("skypath", path);
    }

    fn write_pass_report(&self, w: &mut ValueWriter, loaded: &LoadedElements, now: Epoch) {
        let hours_until = |t: Epoch| 24.0 * now.days_until(&t);

        let age = loaded.satellite.age(now);
        w.marked(
            "T_Age",
            format_args!("{:.2}", age),
            Level::warn_if(age.abs() > ELEMENT_AGE_WARNING_DAYS),
        );
        w.value("T_Sunlit", if loaded.sunlit { "Yes" } else { "No" });

        let rate = self.look.range_rate_km_s;
        w.value("T_Range", format_args!("{:.2}", self.look.range_km));
        w.value("T_RangeR", format_args!("{:.2}", rate * 1000.0));
        w.value("T_VHFDoppler", format_args!("{:.2}", doppler_shift_khz(self.doppler.vhf_hz, rate)));
        w.value("T_UHFDoppler", format_args!("{:.2}", doppler_shift_khz(self.doppler.uhf_hz, rate)));

        match self.events.rise {
            Some(rise) => {
                let dt = hours_until(rise.time);
                let level = if dt < MINUTE_IN_HOURS { Level::Good } else { Level::Normal };
                w.marked("T_NextRise", sexagesimal(dt), level);
                w.value("T_RiseAz", format_args!("{:.2}", rise.azimuth_deg));
            }
            None => {
                w.unknown("T_NextRise");
                w.unknown("T_RiseAz");
            }
        }

        match self.events.transit {
            Some(transit) => {
                w.value("T_NextTrans", sexagesimal(hours_until(transit.time)));
                w.value("T_TransAz", format_args!("{:.2}", transit.azimuth_deg));
                w.value("T_TransEl", format_args!("{:.2}", transit.elevation_deg));
            }
            None => {
                w.unknown("T_NextTrans");
                w.unknown("T_TransAz");
                w.unknown("T_TransEl");
            }
        }

        match self.events.set {
            Some(set) => {
                w.value("T_NextSet", sexagesimal(hours_until(set.time)));
                w.value("T_SetAz", format_args!("{:.2}", set.azimuth_deg));
            }
            None => {
                w.unknown("T_NextSet");
                w.unknown("T_SetAz");
            }
        }

        match (self.events.rise, self.events.set) {
            (Some(rise), Some(set)) if rise.time < set.time => {
                // whole next pass
                w.value("T_Up", sexagesimal(24.0 * rise.time.days_until(&set.time)));
            }
            (Some(_), Some(set)) => {
                // rest of this pass
                let left = hours_until(set.time);
                w.marked("T_Up", sexagesimal(left), Level::warn_if(left < MINUTE_IN_HOURS));
            }
            _ => w.blank("T_Up"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::CalendarTime;

    const ISS_L1: &str =
        "1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990";
    const ISS_L2: &str =
        "2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279";

    const READY: Readiness = Readiness {
        gimbal_connected: true,
        gimbal_calibrated: true,
        sensor_connected: true,
    };

    fn paris() -> ObserverFrame {
        ObserverFrame::new(48.8566, 2.3522, 35.0)
    }

    fn utc(h: u32, m: u32, s: u32) -> Epoch {
        Epoch::from_calendar(CalendarTime::new(2025, 10, 5, h, m, s)).unwrap()
    }

    fn iss_text() -> String {
        format!("ISS\n{}\n{}\n", ISS_L1, ISS_L2)
    }

    fn report(target: &Target, now: Epoch) -> String {
        let mut w = ValueWriter::new();
        target.write_report(&mut w, now);
        w.finish()
    }

    #[test]
    fn upload_predicts_the_next_pass() {
        let mut target = Target::new(DopplerReference::default());
        let name = target.upload(&iss_text(), utc(12, 0, 0), &paris()).unwrap();
        assert_eq!(name, "ISS");
        assert!(target.events().is_complete());
        assert!(!target.events().is_up());
        assert_eq!(target.sky_path().len(), 20);
        assert!(target.look().elevation_deg < 0.0);
        assert!(!target.is_tracking());

        let text = report(&target, utc(12, 0, 0));
        assert!(text.contains("T_NextRise=0:13:"), "{text}");
        assert!(text.contains(&format!("T_TLE=ISS\n{}\n{}\n", ISS_L1, ISS_L2)));
        assert!(text.contains("T_Status=Down\n"));
        assert!(text.contains("T_Age=0.00\n"));
        assert!(text.contains("T_Up=0:10:5") || text.contains("T_Up=0:11:0"), "{text}");
        assert!(text.contains("tracking=Off\n"));
        assert_eq!(text.lines().last().map(|l| l.matches(';').count()), Some(20));
    }

    #[test]
    fn invalid_upload_drops_previous_elements() {
        let mut target = Target::new(DopplerReference::default());
        target.upload(&iss_text(), utc(12, 0, 0), &paris()).unwrap();

        let corrupt = iss_text().replace("51.6327", "51.6328");
        let err = target.upload(&corrupt, utc(12, 0, 0), &paris()).unwrap_err();
        assert_eq!(err.to_string(), "Uploaded TLE is invalid!");
        assert!(target.elements().is_none());
        assert!(target.sky_path().is_empty());

        let text = report(&target, utc(12, 0, 0));
        assert!(text.starts_with("T_TLE=\n\n\nT_Status=No target!\n"), "{text}");
    }

    #[test]
    fn overrides_normalise_and_clear_the_pass() {
        let mut target = Target::new(DopplerReference::default());
        target.upload(&iss_text(), utc(12, 0, 0), &paris()).unwrap();

        target.override_azimuth(-10.0);
        target.override_elevation(95.0);
        assert!(target.is_overridden());
        assert!(target.elements().is_none());
        assert_eq!(target.pointing(), Orientation::new(350.0, 90.0));

        target.override_azimuth(725.0);
        assert_eq!(target.pointing().azimuth_deg, 5.0);

        let text = report(&target, utc(12, 0, 0));
        assert!(text.starts_with("T_Az=5.00!\nT_El=90.00!\nT_TLE=\n"));
        assert!(text.contains("T_Age=\n"));
        assert!(text.contains("T_SetAz=\n"));
        assert!(text.contains("T_Status=Up+\n"));
        assert!(text.ends_with("skypath=\n"));

        // update_topo leaves an override alone
        target.update_topo(utc(12, 18, 0), &paris()).unwrap();
        assert_eq!(target.pointing(), Orientation::new(5.0, 90.0));
    }

    #[test]
    fn tracking_policy() {
        let mut target = Target::new(DopplerReference::default());

        let no_gimbal = Readiness::default();
        assert!(matches!(
            target.set_tracking_state(true, no_gimbal),
            Err(TrackerError::NoGimbal)
        ));
        assert!(!target.is_tracking());

        let calibrating = Readiness {
            gimbal_calibrated: false,
            ..READY
        };
        assert_eq!(
            target.set_tracking_state(true, calibrating).unwrap(),
            TrackingState::Calibrating
        );
        assert!(target.is_tracking());

        let no_sensor = Readiness {
            sensor_connected: false,
            ..READY
        };
        let err = target.set_tracking_state(true, no_sensor).unwrap_err();
        assert_eq!(err.to_string(), "Can not track without a position sensor!");
        assert!(!target.is_tracking());

        // calibration needs the sensor too
        let uncalibrated_no_sensor = Readiness {
            gimbal_calibrated: false,
            sensor_connected: false,
            ..READY
        };
        assert!(matches!(
            target.set_tracking_state(true, uncalibrated_no_sensor),
            Err(TrackerError::NoSensor)
        ));
        assert!(!target.is_tracking());

        assert!(matches!(
            target.set_tracking_state(true, READY),
            Err(TrackerError::NoTarget)
        ));

        target.upload(&iss_text(), utc(12, 0, 0), &paris()).unwrap();
        let state = target.set_tracking_state(true, READY).unwrap();
        assert_eq!(state.to_string(), "Now tracking: ISS+");
        assert!(target.is_tracking());

        target.override_elevation(30.0);
        assert_eq!(
            target.set_tracking_state(true, READY).unwrap(),
            TrackingState::Override
        );

        let off = target.set_tracking_state(false, READY).unwrap();
        assert_eq!(off.to_string(), "Tracking is off");
        assert!(!target.is_tracking());
    }

    #[test]
    fn new_elements_stop_tracking() {
        let mut target = Target::new(DopplerReference::default());
        target.override_azimuth(100.0);
        target.set_tracking_state(true, READY).unwrap();
        target.upload(&iss_text(), utc(12, 0, 0), &paris()).unwrap();
        assert!(!target.is_tracking());
        assert!(!target.is_overridden());
    }

    #[test]
    fn crossing_rise_searches_again() {
        let observer = paris();
        let mut target = Target::new(DopplerReference::default());
        target.upload(&iss_text(), utc(12, 0, 0), &observer).unwrap();

        assert!(!target.refresh_if_boundary_crossed(utc(12, 10, 0), &observer).unwrap());
        assert!(target.refresh_if_boundary_crossed(utc(12, 15, 0), &observer).unwrap());

        // mid-pass: set comes before the following rise
        assert!(target.events().is_up());
        assert!(target.look().elevation_deg > 0.0);
        let path = target.sky_path();
        assert_eq!(path.len(), 20);
        assert!((path[0].elevation_deg - target.look().elevation_deg).abs() < 1e-9);

        let text = report(&target, utc(12, 15, 0));
        assert!(text.contains("T_Status=Up+\n"));
        assert!(text.contains("T_Up=0:09:"), "{text}");
        // range rate in m/s, as the Doppler shifts use it
        let rate = target.look().range_rate_km_s * 1000.0;
        assert!(rate.abs() > 100.0);
        assert!(text.contains(&format!("T_RangeR={:.2}\n", rate)), "{text}");
    }
}
