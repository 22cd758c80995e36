use crate::control::report::{Level, ValueWriter};
use crate::predict::{ObserverFrame, OrbitalElements};
use crate::site::error::SiteError;
use crate::site::fix::{Fix, SourceStatus, SourceUpdate};
use crate::site::magnetic::Declination;
use crate::time::{CalendarTime, Epoch, EpochClock};

// location changes smaller than these are receiver jitter
const LATITUDE_JITTER_DEG: f64 = 0.01;
const LONGITUDE_JITTER_DEG: f64 = 0.01;
const ALTITUDE_JITTER_M: f64 = 100.0;

const MIN_ALTITUDE_M: f64 = -1_000.0;
const MAX_ALTITUDE_M: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SiteChange {
    pub time: bool,
    pub location: bool,
}

impl SiteChange {
    pub fn any(&self) -> bool {
        self.time || self.location
    }
}

pub struct Site {
    clock: EpochClock,
    latitude_deg: f64,
    longitude_deg: f64,
    altitude_m: f64,
    observer: ObserverFrame,
    model: Box<dyn Declination>,
    declination_deg: f64,
    hdop: f64,
    satellites: u32,
    source: SourceStatus,
    time_overridden: bool,
    location_overridden: bool,
}

impl Site {
    pub fn new(
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        start: CalendarTime,
        model: Box<dyn Declination>,
        now_ms: u64,
    ) -> Result<Self, SiteError> {
        check_location(latitude_deg, longitude_deg, altitude_m)?;
        let mut site = Self {
            clock: EpochClock::new(start, now_ms)?,
            latitude_deg,
            longitude_deg,
            altitude_m,
            observer: ObserverFrame::new(latitude_deg, longitude_deg, altitude_m),
            model,
            declination_deg: 0.0,
            hdop: 99.0,
            satellites: 0,
            source: SourceStatus::NotFound,
            time_overridden: false,
            location_overridden: false,
        };
        site.refresh_declination(now_ms);
        Ok(site)
    }

    pub fn now(&self, now_ms: u64) -> Epoch {
        self.clock.now(now_ms)
    }

    pub fn calendar(&self, now_ms: u64) -> CalendarTime {
        self.clock.calendar(now_ms)
    }

    pub fn observer(&self) -> &ObserverFrame {
        &self.observer
    }

    /// True azimuth minus magnetic azimuth, degrees.
    pub fn declination_deg(&self) -> f64 {
        self.declination_deg
    }

    pub fn source_status(&self) -> SourceStatus {
        self.source
    }

    pub fn is_overridden(&self) -> bool {
        self.time_overridden || self.location_overridden
    }

    pub fn element_age(&self, elements: &OrbitalElements, now_ms: u64) -> f64 {
        self.now(now_ms) - elements.epoch
    }

    pub fn apply(&mut self, update: SourceUpdate, now_ms: u64) -> SiteChange {
        match update {
            SourceUpdate::NoLock => {
                if self.source == SourceStatus::Locked {
                    log::warn!("Time and location source lost its fix");
                }
                self.source = SourceStatus::NoLock;
                SiteChange::default()
            }
            SourceUpdate::Fix(fix) => {
                if self.source != SourceStatus::Locked {
                    log::info!("Time and location source locked ({} satellites)", fix.satellites);
                }
                self.source = SourceStatus::Locked;
                self.apply_fix(&fix, now_ms)
            }
        }
    }

    fn apply_fix(&mut self, fix: &Fix, now_ms: u64) -> SiteChange {
        let mut change = SiteChange::default();
        if fix.is_stale() {
            log::warn!("Possible stale fix, {} ms old", fix.age_ms);
        }

        if !self.time_overridden {
            match self.clock.set_now(fix.utc, now_ms) {
                Ok(()) => change.time = true,
                Err(e) => log::warn!("Ignoring fix time: {}", e),
            }
        }

        let moved = (self.latitude_deg - fix.latitude_deg).abs() > LATITUDE_JITTER_DEG
            || (self.longitude_deg - fix.longitude_deg).abs() > LONGITUDE_JITTER_DEG
            || (self.altitude_m - fix.altitude_m).abs() > ALTITUDE_JITTER_M;
        if !self.location_overridden && moved {
            match check_location(fix.latitude_deg, fix.longitude_deg, fix.altitude_m) {
                Ok(()) => {
                    self.relocate(fix.latitude_deg, fix.longitude_deg, fix.altitude_m, now_ms);
                    change.location = true;
                }
                Err(e) => log::warn!("Ignoring fix location: {}", e),
            }
        }

        self.hdop = fix.hdop;
        self.satellites = fix.satellites;
        change
    }

    pub fn override_time(
        &mut self,
        hour: u32,
        minute: Option<u32>,
        second: Option<u32>,
        now_ms: u64,
    ) -> Result<(), SiteError> {
        let mut cal = self.calendar(now_ms);
        cal.hour = hour;
        cal.minute = minute.unwrap_or(cal.minute);
        cal.second = second.unwrap_or(cal.second);
        self.override_calendar(cal, now_ms)
    }

    pub fn override_date(
        &mut self,
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
        now_ms: u64,
    ) -> Result<(), SiteError> {
        let mut cal = self.calendar(now_ms);
        cal.year = year;
        cal.month = month.unwrap_or(cal.month);
        cal.day = day.unwrap_or(cal.day);
        self.override_calendar(cal, now_ms)
    }

    fn override_calendar(&mut self, cal: CalendarTime, now_ms: u64) -> Result<(), SiteError> {
        self.clock.set_now(cal, now_ms)?;
        self.time_overridden = true;
        log::info!(
            "Time overridden to {}-{:02}-{:02} {:02}:{:02}:{:02}",
            cal.year,
            cal.month,
            cal.day,
            cal.hour,
            cal.minute,
            cal.second
        );
        self.refresh_declination(now_ms);
        Ok(())
    }

    pub fn override_latitude(&mut self, latitude_deg: f64, now_ms: u64) -> Result<(), SiteError> {
        self.override_location(latitude_deg, self.longitude_deg, self.altitude_m, now_ms)
    }

    pub fn override_longitude(&mut self, longitude_deg: f64, now_ms: u64) -> Result<(), SiteError> {
        self.override_location(self.latitude_deg, longitude_deg, self.altitude_m, now_ms)
    }

    pub fn override_altitude(&mut self, altitude_m: f64, now_ms: u64) -> Result<(), SiteError> {
        self.override_location(self.latitude_deg, self.longitude_deg, altitude_m, now_ms)
    }

    fn override_location(
        &mut self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        now_ms: u64,
    ) -> Result<(), SiteError> {
        check_location(latitude_deg, longitude_deg, altitude_m)?;
        self.location_overridden = true;
        self.relocate(latitude_deg, longitude_deg, altitude_m, now_ms);
        Ok(())
    }

    pub fn resume_source(&mut self) {
        self.time_overridden = false;
        self.location_overridden = false;
        log::info!("Time and location follow the source again");
    }

    fn relocate(&mut self, latitude_deg: f64, longitude_deg: f64, altitude_m: f64, now_ms: u64) {
        self.latitude_deg = latitude_deg;
        self.longitude_deg = longitude_deg;
        self.altitude_m = altitude_m;
        self.observer = ObserverFrame::new(latitude_deg, longitude_deg, altitude_m);
        log::info!(
            "Observer at {:.4}, {:.4}, {:.0} m",
            latitude_deg,
            longitude_deg,
            altitude_m
        );
        self.refresh_declination(now_ms);
    }

    fn refresh_declination(&mut self, now_ms: u64) {
        let year = self.clock.decimal_year(now_ms);
        match self
            .model
            .declination(self.latitude_deg, self.longitude_deg, self.altitude_m, year)
        {
            Ok(d) => self.declination_deg = d,
            Err(e) => log::warn!("{}; keeping declination {:.2}", e, self.declination_deg),
        }
    }

    pub fn write_report(&self, w: &mut ValueWriter, now_ms: u64) {
        let cal = self.calendar(now_ms);
        let time_level = Level::warn_if(self.time_overridden);
        let location_level = Level::warn_if(self.location_overridden);

        w.marked(
            "GPS_Date",
            format_args!("{} {} {}", cal.year, cal.month, cal.day),
            time_level,
        );
        w.marked(
            "GPS_UTC",
            format_args!("{}:{:02}:{:02}", cal.hour, cal.minute, cal.second),
            time_level,
        );

        let locked = self.source == SourceStatus::Locked;
        let status = match self.source {
            SourceStatus::Locked if self.is_overridden() => "Overridden!",
            SourceStatus::Locked => "Locked+",
            SourceStatus::NoLock => "No lock!",
            SourceStatus::NotFound => "Not found!",
        };
        w.value("GPS_Status", status);
        w.value("GPS_Enable", locked && self.is_overridden());

        w.marked("GPS_Lat", format_args!("{:.3}", self.latitude_deg), location_level);
        w.marked("GPS_Long", format_args!("{:.3}", self.longitude_deg), location_level);
        w.marked("GPS_Alt", format_args!("{:.2}", self.altitude_m), location_level);
        w.value("GPS_MagDecl", format_args!("{:.2}", self.declination_deg));
        w.value("GPS_HDOP", format_args!("{:.2}", self.hdop));
        w.value("GPS_NSat", self.satellites);
    }
}

fn check_location(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<(), SiteError> {
    if !(-90.0..=90.0).contains(&latitude_deg) {
        return Err(SiteError::Latitude(latitude_deg));
    }
    if !(-180.0..=180.0).contains(&longitude_deg) {
        return Err(SiteError::Longitude(longitude_deg));
    }
    if !(MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&altitude_m) {
        return Err(SiteError::Altitude(altitude_m));
    }
    Ok(())
}
