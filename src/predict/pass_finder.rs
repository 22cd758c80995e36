use crate::predict::error::PredictError;
use crate::predict::observer::ObserverFrame;
use crate::predict::propagator::Satellite;
use crate::predict::topo::{topocentric, Topocentric};
use crate::predict::types::{
    HorizonEvent, PassEvents, SkyPath, SkyPoint, TransitEvent, SKY_PATH_POINTS,
};
use crate::time::{Epoch, SECONDS_PER_DAY};

const COARSE_STEP_SECONDS: i64 = 60;
const FINE_STEP_SECONDS: i64 = -1;
const SEARCH_HORIZON_DAYS: f64 = 2.0;
const SKY_PATH_UP_ELEVATION: f64 = -1.0;

fn look(
    sat: &Satellite,
    observer: &ObserverFrame,
    at: Epoch,
) -> Result<Topocentric, PredictError> {
    Ok(topocentric(&sat.predict(at)?, observer))
}

/// Find the next rise, transit and set after `now`.
///
/// Steps forward a minute at a time. A horizon crossing reverses direction at
/// one second per step until the crossing is seen again, which pins the event
/// to the second, then the coarse forward search resumes from there. Transit
/// is the middle of three coarse samples forming a peak above the horizon.
/// Events not found within two days are left empty.
pub fn find_next_pass(
    sat: &Satellite,
    observer: &ObserverFrame,
    now: Epoch,
) -> Result<PassEvents, PredictError> {
    let mut events = PassEvents::default();
    let mut step = COARSE_STEP_SECONDS;
    let mut t = now;
    // previous two elevations and the previous azimuth
    let mut pel = 0.0;
    let mut ppel = 0.0;
    let mut paz = 0.0;

    while !events.is_complete() && now.days_until(&t) < SEARCH_HORIZON_DAYS {
        let topo = look(sat, observer, t)?;
        let (tel, taz) = (topo.elevation_deg, topo.azimuth_deg);

        if step == COARSE_STEP_SECONDS && tel > 0.0 && ppel > 0.0 && ppel < pel && pel > tel {
            events.transit = Some(TransitEvent {
                time: t.plus_seconds(-COARSE_STEP_SECONDS),
                azimuth_deg: paz,
                elevation_deg: pel,
            });
        }

        // going up
        if tel > 0.0 && pel < 0.0 {
            if step == FINE_STEP_SECONDS {
                // backwards through a set
                events.set = Some(HorizonEvent {
                    time: t,
                    azimuth_deg: taz,
                });
                step = COARSE_STEP_SECONDS;
                pel = tel;
            } else if events.rise.is_none() {
                step = FINE_STEP_SECONDS;
                pel = tel;
            }
        }

        // going down
        if tel < 0.0 && pel > 0.0 {
            if step == FINE_STEP_SECONDS {
                // backwards through a rise
                events.rise = Some(HorizonEvent {
                    time: t,
                    azimuth_deg: taz,
                });
                step = COARSE_STEP_SECONDS;
                pel = tel;
            } else if events.set.is_none() {
                step = FINE_STEP_SECONDS;
                pel = tel;
            }
        }

        paz = taz;
        ppel = pel;
        pel = tel;
        t.add_seconds(step);
    }

    log::debug!(
        "Pass search for {}: rise {}, transit {}, set {}",
        sat.elements().name,
        events.rise.is_some(),
        events.transit.is_some(),
        events.set.is_some()
    );

    Ok(events)
}

/// Sample the current or next pass into equally spaced points ending at set.
///
/// Starts now when `current_elevation` says the satellite is up (the known
/// rise then belongs to the following pass), otherwise at rise. Empty when
/// rise or set is unknown, when they belong to different passes, or when the
/// set has already happened.
pub fn compute_sky_path(
    sat: &Satellite,
    observer: &ObserverFrame,
    now: Epoch,
    current_elevation: f64,
    events: &PassEvents,
) -> Result<SkyPath, PredictError> {
    let mut path = SkyPath::new();
    let (Some(rise), Some(set)) = (events.rise, events.set) else {
        return Ok(path);
    };

    let start = if current_elevation > SKY_PATH_UP_ELEVATION {
        now
    } else if rise.time < set.time {
        rise.time
    } else {
        return Ok(path);
    };

    let seconds_up = (start.days_until(&set.time) * SECONDS_PER_DAY) as i64;
    if seconds_up <= 0 {
        return Ok(path);
    }
    let step = seconds_up / (SKY_PATH_POINTS as i64 - 1);

    let mut t = start;
    while !path.is_full() {
        let topo = look(sat, observer, t)?;
        // capacity checked by is_full
        let _ = path.push(SkyPoint {
            azimuth_deg: topo.azimuth_deg,
            elevation_deg: topo.elevation_deg,
        });
        t.add_seconds(step);
    }

    Ok(path)
}
