use std::f64::consts::PI;

use crate::predict::constants::{
    GHA_AT_REFERENCE_DEG, OBLIQUITY_DEG, SIDEREAL_RATE, SOLAR_RATE, SUN_EQUATION_OF_CENTER_1,
    SUN_EQUATION_OF_CENTER_2, SUN_MEAN_ANOMALY_DEG, SUN_MEAN_ANOMALY_RATE_DEG, REFERENCE_YEAR,
};
use crate::predict::vector::{rotate_z, Vec3};
use crate::time::Epoch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunState {
    pub inertial: Vec3,
    pub earth_fixed: Vec3,
}

impl SunState {
    pub fn declination_deg(&self) -> f64 {
        self.inertial[2].asin().to_degrees()
    }
}

pub fn predict_sun(at: Epoch) -> SunState {
    let t = at - Epoch::year_start(REFERENCE_YEAR);
    let gha_equinox = GHA_AT_REFERENCE_DEG.to_radians() + t * SIDEREAL_RATE;

    let mean_longitude = GHA_AT_REFERENCE_DEG.to_radians() + t * SOLAR_RATE + PI;
    let mean_anomaly = (SUN_MEAN_ANOMALY_DEG + t * SUN_MEAN_ANOMALY_RATE_DEG).to_radians();
    let true_longitude = mean_longitude
        + SUN_EQUATION_OF_CENTER_1 * mean_anomaly.sin()
        + SUN_EQUATION_OF_CENTER_2 * (2.0 * mean_anomaly).sin();

    let (s, c) = true_longitude.sin_cos();
    let (sin_obl, cos_obl) = OBLIQUITY_DEG.to_radians().sin_cos();
    let inertial = [c, s * cos_obl, s * sin_obl];

    SunState {
        inertial,
        earth_fixed: rotate_z(&inertial, -gha_equinox),
    }
}
