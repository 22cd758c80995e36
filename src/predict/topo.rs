use crate::predict::constants::{EARTH_RADIUS_KM, SPEED_OF_LIGHT_KM_S};
use crate::predict::observer::ObserverFrame;
use crate::predict::propagator::SatelliteState;
use crate::predict::sun::SunState;
use crate::predict::vector::{dot, norm, scale, sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Topocentric {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
    /// km/s, positive when receding
    pub range_rate_km_s: f64,
}

/// Project a satellite state onto the site's horizon. Range rate is inertial
/// velocity against the site's rotational velocity, both in Earth-fixed axes.
pub fn topocentric(state: &SatelliteState, observer: &ObserverFrame) -> Topocentric {
    let relative = sub(&state.position, &observer.position);
    let range_km = norm(&relative);
    if range_km == 0.0 {
        return Topocentric::default();
    }
    let los = scale(&relative, 1.0 / range_km);

    let u = dot(&los, &observer.up);
    let e = dot(&los, &observer.east);
    let n = dot(&los, &observer.north);

    let relative_velocity = sub(&state.velocity, &observer.velocity);

    Topocentric {
        azimuth_deg: e.atan2(n).to_degrees().rem_euclid(360.0),
        elevation_deg: u.clamp(-1.0, 1.0).asin().to_degrees(),
        range_km,
        range_rate_km_s: dot(&relative_velocity, &los),
    }
}

pub fn eclipsed(state: &SatelliteState, sun: &SunState) -> bool {
    let cos_angle = -dot(&state.inertial_position, &sun.inertial) / state.radius;
    let miss_distance = state.radius * (1.0 - cos_angle * cos_angle).max(0.0).sqrt() / EARTH_RADIUS_KM;
    miss_distance <= 1.0 && cos_angle >= 0.0
}

pub fn doppler_shift_khz(frequency_hz: f64, range_rate_km_s: f64) -> f64 {
    -range_rate_km_s * frequency_hz / SPEED_OF_LIGHT_KM_S / 1000.0
}
