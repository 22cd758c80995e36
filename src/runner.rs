use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::control::{sexagesimal, ControlRequest, MessageBoard, Override, ValueWriter};
use crate::gimbal::{
    write_sensor_report, AxisLimits, Gimbal, GimbalError, GimbalEvent, LimitKind,
    MemoryLimitStore, OrientationSensor, PulseLimits, YamlLimitStore,
};
use crate::predict::{load_tle_file, PredictError};
use crate::sim::{MountGeometry, ScriptedFixSource, SimulatedMount};
use crate::site::{Fix, FixSource, Site, SiteError, SourceUpdate, WorldMagneticModel};
use crate::time::{CalendarTime, Monotonic, SECONDS_PER_DAY};
use crate::tracker::{Readiness, Target};

const TIME_JUMP_SECONDS: f64 = 60.0;

const SIMULATED_LIMITS: AxisLimits = AxisLimits { min: 600, max: 2400 };

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("site: {0}")]
    Site(#[from] SiteError),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// One of each station component. Everything the loop touches lives here and
/// is only ever touched from the loop.
pub struct Context {
    site: Site,
    target: Target,
    gimbal: Gimbal,
    sensor: Option<Box<dyn OrientationSensor>>,
    fix_source: Option<Box<dyn FixSource>>,
    messages: MessageBoard,
    started_ms: u64,
}

impl Context {
    pub fn new(
        site: Site,
        target: Target,
        gimbal: Gimbal,
        sensor: Option<Box<dyn OrientationSensor>>,
        fix_source: Option<Box<dyn FixSource>>,
        now_ms: u64,
    ) -> Self {
        if sensor.is_none() {
            log::warn!("Orientation sensor not found");
        }
        Self {
            site,
            target,
            gimbal,
            sensor,
            fix_source,
            messages: MessageBoard::new(),
            started_ms: now_ms,
        }
    }

    pub fn from_config(config: &Config, now_ms: u64) -> Result<Self, RunnerError> {
        let site_config = &config.site;
        let start = CalendarTime::from(site_config.start_time.unwrap_or_else(Utc::now).naive_utc());
        let site = Site::new(
            site_config.latitude_deg,
            site_config.longitude_deg,
            site_config.altitude_m,
            start,
            Box::new(WorldMagneticModel::default()),
            now_ms,
        )?;

        let mut ctx = if config.simulate {
            log::info!("Driving a simulated mount");
            let mount = SimulatedMount::new(MountGeometry::default());
            let gimbal = Gimbal::new(
                Some(Box::new(mount.clone())),
                config.gimbal.channels,
                Box::new(MemoryLimitStore::new(PulseLimits {
                    axes: [SIMULATED_LIMITS; 2],
                })),
            );
            let fix = Fix {
                latitude_deg: site_config.latitude_deg,
                longitude_deg: site_config.longitude_deg,
                altitude_m: site_config.altitude_m,
                utc: start,
                age_ms: 0,
                hdop: 0.9,
                satellites: 9,
            };
            let source = ScriptedFixSource::new([SourceUpdate::Fix(fix)]);
            Self::new(
                site,
                Target::new(config.radio.doppler()),
                gimbal,
                Some(Box::new(mount)),
                Some(Box::new(source)),
                now_ms,
            )
        } else {
            let gimbal = Gimbal::new(
                None,
                config.gimbal.channels,
                Box::new(YamlLimitStore::new(&config.gimbal.limits_file)),
            );
            Self::new(site, Target::new(config.radio.doppler()), gimbal, None, None, now_ms)
        };

        if let Some(path) = &config.tle_file {
            match load_tle_file(path)?.into_iter().next() {
                Some((tle, _)) => {
                    let now = ctx.site.now(now_ms);
                    match ctx.target.set_elements(tle, now, ctx.site.observer()) {
                        Ok(name) => ctx.messages.post(format_args!("Loaded TLE for {}+", name)),
                        Err(e) => ctx.messages.post(e),
                    }
                }
                None => log::warn!("No usable element set in {}", path.display()),
            }
        }

        Ok(ctx)
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn gimbal(&self) -> &Gimbal {
        &self.gimbal
    }

    pub fn message(&self) -> &str {
        self.messages.current()
    }

    fn readiness(&self) -> Readiness {
        Readiness {
            gimbal_connected: self.gimbal.is_connected(),
            gimbal_calibrated: self.gimbal.is_calibrated(),
            sensor_connected: self.sensor.is_some(),
        }
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.poll_fix_source(now_ms);

        let now = self.site.now(now_ms);
        match self.target.refresh_if_boundary_crossed(now, self.site.observer()) {
            Ok(true) => log::debug!("Pass boundary crossed, searched again"),
            Ok(false) => {}
            Err(e) => log::error!("Pass search failed: {}", e),
        }
        if let Err(e) = self.target.update_topo(now, self.site.observer()) {
            log::error!("Target update failed: {}", e);
        }

        if self.target.is_tracking() {
            self.drive_gimbal(now_ms);
        }
    }

    fn poll_fix_source(&mut self, now_ms: u64) {
        let Some(source) = self.fix_source.as_deref_mut() else {
            return;
        };
        let updates: Vec<SourceUpdate> = std::iter::from_fn(|| source.poll()).collect();

        for update in updates {
            let before = self.site.now(now_ms);
            let change = self.site.apply(update, now_ms);
            let jumped = change.time
                && ((self.site.now(now_ms) - before) * SECONDS_PER_DAY).abs() > TIME_JUMP_SECONDS;
            if change.location || jumped {
                self.retarget(now_ms);
            }
        }
    }

    fn drive_gimbal(&mut self, now_ms: u64) {
        let Some(sensor) = self.sensor.as_deref_mut() else {
            return;
        };
        let result = self.gimbal.move_to_az_el(
            now_ms,
            self.target.pointing(),
            sensor,
            self.site.declination_deg(),
        );
        match result {
            Ok(Some(GimbalEvent::Calibrated { .. })) => self.set_tracking(true),
            Ok(None) => {}
            Err(e) => log::warn!("Gimbal cycle skipped: {}", e),
        }
    }

    fn retarget(&mut self, now_ms: u64) {
        let now = self.site.now(now_ms);
        let observer = self.site.observer();
        let result = self
            .target
            .update_topo(now, observer)
            .and_then(|_| self.target.refresh_pass(now, observer));
        if let Err(e) = result {
            log::error!("Target update failed: {}", e);
        }
    }

    pub fn set_tracking(&mut self, on: bool) {
        let ready = self.readiness();
        match self.target.set_tracking_state(on, ready) {
            Ok(state) => self.messages.post(state),
            Err(e) => self.messages.post(e),
        }
    }

    pub fn handle(&mut self, request: ControlRequest, now_ms: u64) {
        // a dropped reply only means the client went away
        match request {
            ControlRequest::Report { reply } => {
                let _ = reply.send(self.report(now_ms));
            }
            ControlRequest::Override { body, reply } => {
                self.apply_override(&body, now_ms);
                let _ = reply.send(());
            }
            ControlRequest::Tracking { on, reply } => {
                self.set_tracking(on);
                let _ = reply.send(());
            }
        }
    }

    pub fn report(&mut self, now_ms: u64) -> String {
        let mut w = ValueWriter::new();
        w.value("op_message", self.messages.current());
        let uptime_h = now_ms.saturating_sub(self.started_ms) as f64 / 3_600_000.0;
        w.value("uptime", sexagesimal(uptime_h));

        self.site.write_report(&mut w, now_ms);
        self.gimbal.write_report(&mut w);
        write_sensor_report(self.sensor.as_deref_mut(), self.site.declination_deg(), &mut w);
        self.target.write_report(&mut w, self.site.now(now_ms));
        w.finish()
    }

    pub fn apply_override(&mut self, body: &str, now_ms: u64) {
        let command: Override = match body.parse() {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Rejected override {:?}", body.lines().next().unwrap_or(""));
                self.messages.post(e);
                return;
            }
        };
        log::info!("Override: {}", body.lines().next().unwrap_or(""));

        match command {
            Override::Time {
                hour,
                minute,
                second,
            } => {
                let result = self.site.override_time(hour, minute, second, now_ms);
                self.after_site_override(result, now_ms);
            }
            Override::Date { year, month, day } => {
                let result = self.site.override_date(year, month, day, now_ms);
                self.after_site_override(result, now_ms);
            }
            Override::Latitude(lat) => {
                let result = self.site.override_latitude(lat, now_ms);
                self.after_site_override(result, now_ms);
            }
            Override::Longitude(lon) => {
                let result = self.site.override_longitude(lon, now_ms);
                self.after_site_override(result, now_ms);
            }
            Override::Altitude(alt) => {
                let result = self.site.override_altitude(alt, now_ms);
                self.after_site_override(result, now_ms);
            }
            Override::ResumeSource => {
                self.site.resume_source();
                self.messages.post("Time and location follow GPS again+");
            }
            Override::TargetAzimuth(az) => self.target.override_azimuth(az),
            Override::TargetElevation(el) => self.target.override_elevation(el),
            Override::MotorPosition { axis, pulse } => {
                if !self.gimbal.is_connected() {
                    self.messages.post("No gimbal!");
                    return;
                }
                self.set_tracking(false);
                if let Err(e) = self.gimbal.set_position(axis, pulse) {
                    self.messages.post(format_args!("Servo {} not moved: {}!", axis + 1, e));
                }
            }
            Override::MotorLimit { axis, kind, pulse } => {
                let which = match kind {
                    LimitKind::Min => "minimum",
                    LimitKind::Max => "maximum",
                };
                match self.gimbal.set_limit(axis, kind, pulse) {
                    Ok(()) => self
                        .messages
                        .post(format_args!("Servo {} {} saved+", axis + 1, which)),
                    Err(GimbalError::NoController) => self.messages.post("No gimbal!"),
                    Err(e) => {
                        log::error!("Saving servo limits failed: {}", e);
                        self.messages
                            .post(format_args!("Servo {} {} not saved!", axis + 1, which));
                    }
                }
            }
            Override::Elements(text) => {
                let now = self.site.now(now_ms);
                match self.target.upload(&text, now, self.site.observer()) {
                    Ok(name) => self
                        .messages
                        .post(format_args!("New TLE uploaded successfully for {}+", name)),
                    Err(e) => self.messages.post(e),
                }
            }
        }
    }

    fn after_site_override(&mut self, result: Result<(), SiteError>, now_ms: u64) {
        match result {
            Ok(()) => self.retarget(now_ms),
            Err(e) => self.messages.post(format_args!("Override rejected: {}!", e)),
        }
    }
}

pub async fn run(
    mut ctx: Context,
    clock: impl Monotonic,
    tick: Duration,
    mut requests: mpsc::Receiver<ControlRequest>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => ctx.tick(clock.millis()),
            Some(request) = requests.recv() => ctx.handle(request, clock.millis()),
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping control loop");
                break;
            }
        }
    }
}
