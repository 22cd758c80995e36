use std::f64::consts::TAU;

pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_224;
pub const GM_KM3_S2: f64 = 3.986e5;
pub const J2: f64 = 1.082_63e-3;

pub const TROPICAL_YEAR_DAYS: f64 = 365.242_187_4;
pub const SOLAR_RATE: f64 = TAU / TROPICAL_YEAR_DAYS;
pub const SIDEREAL_RATE: f64 = TAU + SOLAR_RATE;
pub const EARTH_ROTATION_RAD_S: f64 = SIDEREAL_RATE / 86_400.0;

pub const REFERENCE_YEAR: i32 = 2014;
pub const GHA_AT_REFERENCE_DEG: f64 = 99.5828;

pub const SUN_MEAN_ANOMALY_DEG: f64 = 356.4105;
pub const SUN_MEAN_ANOMALY_RATE_DEG: f64 = 0.985_600_28;
pub const SUN_EQUATION_OF_CENTER_1: f64 = 0.033_40;
pub const SUN_EQUATION_OF_CENTER_2: f64 = 0.000_35;
pub const OBLIQUITY_DEG: f64 = 23.4375;

pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
