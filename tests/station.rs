use approx::assert_abs_diff_eq;

use sat_pointer::gimbal::{AxisLimits, Gimbal, MemoryLimitStore, PulseLimits};
use sat_pointer::runner::Context;
use sat_pointer::sim::{MountGeometry, ScriptedFixSource, SimulatedMount};
use sat_pointer::site::{Fix, Site, SourceUpdate, WorldMagneticModel};
use sat_pointer::time::CalendarTime;
use sat_pointer::tracker::{DopplerReference, Target};

const ISS_L1: &str = "1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990";
const ISS_L2: &str = "2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279";

const TICK_MS: u64 = 100;

fn paris_site(start: CalendarTime) -> Site {
    Site::new(
        48.8566,
        2.3522,
        35.0,
        start,
        Box::new(WorldMagneticModel::default()),
        0,
    )
    .unwrap()
}

fn simulated_station(start: CalendarTime) -> (Context, SimulatedMount) {
    let mount = SimulatedMount::new(MountGeometry::default());
    let gimbal = Gimbal::new(
        Some(Box::new(mount.clone())),
        [0, 1],
        Box::new(MemoryLimitStore::new(PulseLimits {
            axes: [AxisLimits { min: 600, max: 2400 }; 2],
        })),
    );
    let ctx = Context::new(
        paris_site(start),
        Target::new(DopplerReference::default()),
        gimbal,
        Some(Box::new(mount.clone())),
        None,
        0,
    );
    (ctx, mount)
}

fn run_until(ctx: &mut Context, now_ms: &mut u64, until_ms: u64) {
    while *now_ms < until_ms {
        *now_ms += TICK_MS;
        ctx.tick(*now_ms);
    }
}

fn value<'a>(report: &'a str, name: &str) -> Option<&'a str> {
    report
        .lines()
        .find_map(|l| l.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')))
}

#[test]
fn calibrates_then_follows_an_override() {
    let (mut ctx, mount) = simulated_station(CalendarTime::new(2025, 10, 5, 12, 0, 0));
    let mut now_ms = 0;

    ctx.apply_override("T_Az=250", now_ms);
    ctx.apply_override("T_El=30", now_ms);
    ctx.set_tracking(true);
    assert_eq!(ctx.message(), "Calibrating gimbal motor scales!");

    run_until(&mut ctx, &mut now_ms, 20_000);
    assert!(ctx.gimbal().is_calibrated());
    assert_eq!(ctx.gimbal().azimuth_axis(), 0);
    assert_eq!(ctx.message(), "Now tracking overridden Az and El+");

    run_until(&mut ctx, &mut now_ms, 40_000);
    let pointing = mount.pointing();
    assert_abs_diff_eq!(pointing.azimuth_deg, 250.0, epsilon = 0.5);
    assert_abs_diff_eq!(pointing.elevation_deg, 30.0, epsilon = 0.3);

    let report = ctx.report(now_ms);
    assert_eq!(value(&report, "G_Status"), Some("Ok+"));
    assert_eq!(value(&report, "SS_Status"), Some("Ok+"));
    assert_eq!(value(&report, "tracking"), Some("On"));
    assert_eq!(value(&report, "T_Az"), Some("250.00!"));
    assert_eq!(value(&report, "uptime"), Some("0:00:40"));
}

#[test]
fn gimbal_without_sensor_refuses_to_track() {
    let mount = SimulatedMount::new(MountGeometry::default());
    let gimbal = Gimbal::new(
        Some(Box::new(mount.clone())),
        [0, 1],
        Box::new(MemoryLimitStore::new(PulseLimits {
            axes: [AxisLimits { min: 600, max: 2400 }; 2],
        })),
    );
    let mut ctx = Context::new(
        paris_site(CalendarTime::new(2025, 10, 5, 12, 0, 0)),
        Target::new(DopplerReference::default()),
        gimbal,
        None,
        None,
        0,
    );
    let mut now_ms = 0;

    ctx.apply_override("T_Az=100", now_ms);
    ctx.set_tracking(true);
    assert_eq!(ctx.message(), "Can not track without a position sensor!");

    run_until(&mut ctx, &mut now_ms, 10_000);
    assert!(!ctx.target().is_tracking());
    assert!(!ctx.gimbal().is_calibrated());
    assert_eq!(mount.pulses(), [1500, 1500]);

    let report = ctx.report(now_ms);
    assert_eq!(value(&report, "tracking"), Some("Off"));
    assert_eq!(value(&report, "SS_Status"), Some("Not found!"));
}

#[test]
fn calibration_swaps_axes_on_a_turned_mount() {
    let mount = SimulatedMount::new(MountGeometry {
        azimuth_channel: 1,
        coupling_deg_per_us: 0.01,
        ..MountGeometry::default()
    });
    let gimbal = Gimbal::new(
        Some(Box::new(mount.clone())),
        [0, 1],
        Box::new(MemoryLimitStore::new(PulseLimits {
            axes: [AxisLimits { min: 600, max: 2400 }; 2],
        })),
    );
    let mut ctx = Context::new(
        paris_site(CalendarTime::new(2025, 10, 5, 12, 0, 0)),
        Target::new(DopplerReference::default()),
        gimbal,
        Some(Box::new(mount.clone())),
        None,
        0,
    );
    let mut now_ms = 0;

    ctx.apply_override("T_Az=200", now_ms);
    ctx.apply_override("T_El=20", now_ms);
    ctx.set_tracking(true);
    run_until(&mut ctx, &mut now_ms, 60_000);

    assert_eq!(ctx.gimbal().azimuth_axis(), 1);
    let pointing = mount.pointing();
    assert_abs_diff_eq!(pointing.azimuth_deg, 200.0, epsilon = 0.5);
    assert_abs_diff_eq!(pointing.elevation_deg, 20.0, epsilon = 0.3);
}

#[test]
fn follows_the_iss_across_its_rise() {
    let (mut ctx, mount) = simulated_station(CalendarTime::new(2025, 10, 5, 12, 0, 0));
    let mut now_ms = 0;

    ctx.apply_override(&format!("T_TLE=ISS\r\n{}\r\n{}\r\n", ISS_L1, ISS_L2), now_ms);
    assert_eq!(ctx.message(), "New TLE uploaded successfully for ISS+");
    let first_rise = ctx.target().events().rise.unwrap().time;

    ctx.set_tracking(true);
    run_until(&mut ctx, &mut now_ms, 10_000);
    assert_eq!(ctx.message(), "Now tracking: ISS+");

    // 12:16, a little over two minutes after rise
    run_until(&mut ctx, &mut now_ms, 16 * 60_000);
    let events = ctx.target().events();
    assert!(events.is_up());
    assert!(events.rise.unwrap().time > first_rise);

    let look = *ctx.target().look();
    assert!(look.elevation_deg > 5.0);
    let pointing = mount.pointing();
    assert_abs_diff_eq!(pointing.azimuth_deg, look.azimuth_deg, epsilon = 3.0);
    assert_abs_diff_eq!(pointing.elevation_deg, look.elevation_deg, epsilon = 3.0);

    let report = ctx.report(now_ms);
    assert_eq!(value(&report, "T_Status"), Some("Up+"));
    assert_eq!(value(&report, "T_Sunlit"), Some("Yes"));
    assert!(value(&report, "T_Up").is_some_and(|v| v.starts_with("0:08:")));
    assert_eq!(value(&report, "skypath").map(|p| p.matches(';').count()), Some(20));
}

#[test]
fn fix_source_sets_time_place_and_declination() {
    let start = CalendarTime::new(2017, 7, 1, 0, 0, 0);
    let fix = Fix {
        latitude_deg: 40.0,
        longitude_deg: -105.0,
        altitude_m: 1650.0,
        utc: CalendarTime::new(2017, 7, 2, 12, 0, 0),
        age_ms: 200,
        hdop: 1.2,
        satellites: 8,
    };
    let source = ScriptedFixSource::new([SourceUpdate::NoLock, SourceUpdate::Fix(fix)]);
    let gimbal = Gimbal::new(None, [0, 1], Box::new(MemoryLimitStore::default()));
    let mut ctx = Context::new(
        paris_site(start),
        Target::new(DopplerReference::default()),
        gimbal,
        None,
        Some(Box::new(source)),
        0,
    );

    let report = ctx.report(0);
    assert_eq!(value(&report, "GPS_Status"), Some("Not found!"));
    assert_eq!(value(&report, "GPS_HDOP"), Some("99.00"));

    ctx.tick(100);
    let report = ctx.report(100);
    assert_eq!(value(&report, "GPS_Status"), Some("Locked+"));
    assert_eq!(value(&report, "GPS_Date"), Some("2017 7 2"));
    assert_eq!(value(&report, "GPS_UTC"), Some("12:00:00"));
    assert_eq!(value(&report, "GPS_Lat"), Some("40.000"));
    assert_eq!(value(&report, "GPS_Long"), Some("-105.000"));
    assert_eq!(value(&report, "GPS_MagDecl"), Some("8.29"));
    assert_eq!(value(&report, "GPS_NSat"), Some("8"));
    assert_eq!(value(&report, "GPS_Enable"), Some("false"));

    ctx.apply_override("GPS_Lat=41.5", 200);
    let report = ctx.report(200);
    assert_eq!(value(&report, "GPS_Status"), Some("Overridden!"));
    assert_eq!(value(&report, "GPS_Lat"), Some("41.500!"));
    assert_eq!(value(&report, "GPS_Enable"), Some("true"));

    ctx.apply_override("GPS_Enable=true", 300);
    let report = ctx.report(300);
    assert_eq!(value(&report, "GPS_Status"), Some("Locked+"));
    assert_eq!(value(&report, "GPS_Lat"), Some("41.500"));
}
