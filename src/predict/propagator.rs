use std::f64::consts::TAU;

use crate::predict::constants::{
    EARTH_RADIUS_KM, GHA_AT_REFERENCE_DEG, GM_KM3_S2, J2, REFERENCE_YEAR, SIDEREAL_RATE,
};
use crate::predict::elements::OrbitalElements;
use crate::predict::error::PredictError;
use crate::predict::vector::{rotate_z, Vec3};
use crate::time::{Epoch, SECONDS_PER_DAY};

const KEPLER_TOLERANCE: f64 = 1e-5;
const KEPLER_MAX_ITERATIONS: usize = 50;

/// Satellite position (km) and velocity (km/s) at one instant.
///
/// The Earth-fixed vectors are the inertial ones rotated by the Greenwich hour
/// angle; the velocity is still the inertial velocity, expressed in rotating axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteState {
    pub inertial_position: Vec3,
    pub inertial_velocity: Vec3,
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f64,
}

#[derive(Debug, Clone)]
pub struct Satellite {
    elements: OrbitalElements,
    mean_motion_s: f64,
    semi_major_axis: f64,
    semi_minor_axis: f64,
    node_rate: f64,
    perigee_rate: f64,
    decay_coefficient: f64,
    gha_at_epoch: f64,
}

impl Satellite {
    pub fn new(elements: OrbitalElements) -> Self {
        let e = elements.eccentricity;
        let mean_motion_s = elements.mean_motion / SECONDS_PER_DAY;
        let semi_major_axis = (GM_KM3_S2 / (mean_motion_s * mean_motion_s)).cbrt();
        let semi_minor_axis = semi_major_axis * (1.0 - e * e).sqrt();

        let pc = EARTH_RADIUS_KM * semi_major_axis / (semi_minor_axis * semi_minor_axis);
        let pc = 1.5 * J2 * pc * pc * elements.mean_motion;
        let cos_i = elements.inclination.cos();
        let node_rate = -pc * cos_i;
        let perigee_rate = pc * (5.0 * cos_i * cos_i - 1.0) / 2.0;
        let decay_coefficient = -2.0 * elements.decay / (3.0 * elements.mean_motion);

        let days_since_reference = elements.epoch - Epoch::year_start(REFERENCE_YEAR);
        let gha_at_epoch =
            GHA_AT_REFERENCE_DEG.to_radians() + days_since_reference * SIDEREAL_RATE;

        Self {
            elements,
            mean_motion_s,
            semi_major_axis,
            semi_minor_axis,
            node_rate,
            perigee_rate,
            decay_coefficient,
            gha_at_epoch,
        }
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    pub fn age(&self, at: Epoch) -> f64 {
        at - self.elements.epoch
    }

    pub fn predict(&self, at: Epoch) -> Result<SatelliteState, PredictError> {
        let el = &self.elements;
        let t = self.age(at);

        let dt = self.decay_coefficient * t / 2.0;
        let kd = 1.0 + 4.0 * dt;
        let kdp = 1.0 - 7.0 * dt;

        let mut mean_anomaly = el.mean_anomaly + el.mean_motion * t * (1.0 - 3.0 * dt);
        mean_anomaly -= (mean_anomaly / TAU).trunc() * TAU;

        let ea = solve_kepler(mean_anomaly, el.eccentricity)?;
        let (sin_ea, cos_ea) = ea.sin_cos();
        let denom = 1.0 - el.eccentricity * cos_ea;

        let a = self.semi_major_axis * kd;
        let b = self.semi_minor_axis * kd;
        let radius = a * denom;

        // orbital plane, x towards perigee
        let sx = a * (cos_ea - el.eccentricity);
        let sy = b * sin_ea;
        let vx = -a * sin_ea / denom * self.mean_motion_s;
        let vy = b * cos_ea / denom * self.mean_motion_s;

        let ap = el.argument_of_perigee + self.perigee_rate * t * kdp;
        let raan = el.right_ascension + self.node_rate * t * kdp;
        let (sw, cw) = ap.sin_cos();
        let (sq, cq) = raan.sin_cos();
        let (si, ci) = el.inclination.sin_cos();

        let cx = [cw * cq - sw * ci * sq, -sw * cq - cw * ci * sq];
        let cy = [cw * sq + sw * ci * cq, -sw * sq + cw * ci * cq];
        let cz = [sw * si, cw * si];

        let inertial_position = [
            sx * cx[0] + sy * cx[1],
            sx * cy[0] + sy * cy[1],
            sx * cz[0] + sy * cz[1],
        ];
        let inertial_velocity = [
            vx * cx[0] + vy * cx[1],
            vx * cy[0] + vy * cy[1],
            vx * cz[0] + vy * cz[1],
        ];

        let gha = self.gha_at_epoch + SIDEREAL_RATE * t;

        Ok(SatelliteState {
            inertial_position,
            inertial_velocity,
            position: rotate_z(&inertial_position, -gha),
            velocity: rotate_z(&inertial_velocity, -gha),
            radius,
        })
    }
}

pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64, PredictError> {
    let mut ea = mean_anomaly;
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let correction =
            (ea - eccentricity * ea.sin() - mean_anomaly) / (1.0 - eccentricity * ea.cos());
        ea -= correction;
        if correction.abs() < KEPLER_TOLERANCE {
            return Ok(ea);
        }
    }
    Err(PredictError::NotConverged {
        mean_anomaly,
        eccentricity,
    })
}
