use crate::predict::constants::{EARTH_FLATTENING, EARTH_RADIUS_KM, EARTH_ROTATION_RAD_S};
use crate::predict::vector::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverFrame {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub up: Vec3,
    pub east: Vec3,
    pub north: Vec3,
}

impl Default for ObserverFrame {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl ObserverFrame {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        let lat = latitude_deg.to_radians();
        let lon = longitude_deg.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let height_km = altitude_m / 1000.0;

        let up = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];
        let east = [-sin_lon, cos_lon, 0.0];
        let north = [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat];

        let polar_radius = EARTH_RADIUS_KM * (1.0 - EARTH_FLATTENING);
        let xx = EARTH_RADIUS_KM * EARTH_RADIUS_KM;
        let zz = polar_radius * polar_radius;
        let d = (xx * cos_lat * cos_lat + zz * sin_lat * sin_lat).sqrt();
        let rx = xx / d + height_km;
        let rz = zz / d + height_km;

        let position = [rx * up[0], rx * up[1], rz * up[2]];
        let velocity = [
            -EARTH_ROTATION_RAD_S * position[1],
            EARTH_ROTATION_RAD_S * position[0],
            0.0,
        ];

        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
            position,
            velocity,
            up,
            east,
            north,
        }
    }

    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self::new(lat, lon, altitude_m.unwrap_or(0.0)))
    }
}
