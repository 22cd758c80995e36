use crate::site::error::DeclinationError;

const MAX_DEGREE: usize = 12;
const SIZE: usize = MAX_DEGREE + 1;
const MODEL_EPOCH: f64 = 2015.0;
const VALID_YEARS: f64 = 5.0;

// WGS-84 ellipsoid and the model's reference radius, km
const SEMI_MAJOR: f64 = 6378.137;
const SEMI_MINOR: f64 = 6356.752_314_2;
const REFERENCE_RADIUS: f64 = 6371.2;

pub trait Declination {
    /// Degrees east of true north: magnetic bearing = true azimuth - declination.
    fn declination(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        decimal_year: f64,
    ) -> Result<f64, DeclinationError>;
}

#[derive(Debug, Clone)]
pub struct WorldMagneticModel {
    epoch: f64,
    main: [[f64; SIZE]; SIZE],
    secular: [[f64; SIZE]; SIZE],
    recursion: [[f64; SIZE]; SIZE],
}

impl Default for WorldMagneticModel {
    fn default() -> Self {
        Self::new(MODEL_EPOCH, MAIN_FIELD, SECULAR_VARIATION)
    }
}

impl WorldMagneticModel {
    pub fn new(
        epoch: f64,
        mut main: [[f64; SIZE]; SIZE],
        mut secular: [[f64; SIZE]; SIZE],
    ) -> Self {
        let mut snorm = [[0.0; SIZE]; SIZE];
        let mut recursion = [[0.0; SIZE]; SIZE];

        snorm[0][0] = 1.0;
        for n in 1..SIZE {
            snorm[0][n] = snorm[0][n - 1] * (2 * n - 1) as f64 / n as f64;
            let mut j = 2.0;
            for m in 0..=n {
                let (ni, mi) = (n as f64, m as f64);
                recursion[m][n] =
                    ((ni - 1.0) * (ni - 1.0) - mi * mi) / ((2.0 * ni - 1.0) * (2.0 * ni - 3.0));
                if m > 0 {
                    let flnmj = (ni - mi + 1.0) * j / (ni + mi);
                    snorm[m][n] = snorm[m - 1][n] * flnmj.sqrt();
                    j = 1.0;
                    main[n][m - 1] *= snorm[m][n];
                    secular[n][m - 1] *= snorm[m][n];
                }
                main[m][n] *= snorm[m][n];
                secular[m][n] *= snorm[m][n];
            }
        }
        recursion[1][1] = 0.0;

        Self {
            epoch,
            main,
            secular,
            recursion,
        }
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    fn field(&self, latitude_deg: f64, longitude_deg: f64, altitude_km: f64, dt: f64) -> [f64; 3] {
        let k = &self.recursion;
        let a2 = SEMI_MAJOR * SEMI_MAJOR;
        let b2 = SEMI_MINOR * SEMI_MINOR;
        let c2 = a2 - b2;
        let a4 = a2 * a2;
        let c4 = a4 - b2 * b2;

        let (srlat, crlat) = latitude_deg.to_radians().sin_cos();
        let (srlon, crlon) = longitude_deg.to_radians().sin_cos();
        let srlat2 = srlat * srlat;
        let crlat2 = crlat * crlat;

        // geodetic to spherical
        let q = (a2 - c2 * srlat2).sqrt();
        let q1 = altitude_km * q;
        let q2 = ((q1 + a2) / (q1 + b2)).powi(2);
        let ct = srlat / (q2 * crlat2 + srlat2).sqrt();
        let st = (1.0 - ct * ct).sqrt();
        let r = (altitude_km * altitude_km + 2.0 * q1 + (a4 - c4 * srlat2) / (q * q)).sqrt();
        let d = (a2 * crlat2 + b2 * srlat2).sqrt();
        let ca = (altitude_km + d) / r;
        let sa = c2 * crlat * srlat / (r * d);

        let mut sp = [0.0; SIZE];
        let mut cp = [0.0; SIZE];
        cp[0] = 1.0;
        sp[1] = srlon;
        cp[1] = crlon;
        for m in 2..SIZE {
            sp[m] = sp[1] * cp[m - 1] + cp[1] * sp[m - 1];
            cp[m] = cp[1] * cp[m - 1] - sp[1] * sp[m - 1];
        }

        let mut p = [[0.0; SIZE]; SIZE];
        let mut dp = [[0.0; SIZE]; SIZE];
        let mut pole = [0.0; SIZE];
        p[0][0] = 1.0;
        pole[0] = 1.0;

        let aor = REFERENCE_RADIUS / r;
        let mut ar = aor * aor;
        let (mut br, mut bt, mut bp, mut bpp) = (0.0, 0.0, 0.0, 0.0);

        for n in 1..SIZE {
            ar *= aor;
            for m in 0..=n {
                // unnormalised associated Legendre functions and derivatives
                if n == m {
                    p[m][n] = st * p[m - 1][n - 1];
                    dp[m][n] = st * dp[m - 1][n - 1] + ct * p[m - 1][n - 1];
                } else if n == 1 && m == 0 {
                    p[m][n] = ct * p[m][n - 1];
                    dp[m][n] = ct * dp[m][n - 1] - st * p[m][n - 1];
                } else {
                    if m + 2 > n {
                        p[m][n - 2] = 0.0;
                        dp[m][n - 2] = 0.0;
                    }
                    p[m][n] = ct * p[m][n - 1] - k[m][n] * p[m][n - 2];
                    dp[m][n] = ct * dp[m][n - 1] - st * p[m][n - 1] - k[m][n] * dp[m][n - 2];
                }

                let g = self.main[m][n] + dt * self.secular[m][n];
                let (t1, t2) = if m == 0 {
                    (g * cp[m], g * sp[m])
                } else {
                    let h = self.main[n][m - 1] + dt * self.secular[n][m - 1];
                    (g * cp[m] + h * sp[m], g * sp[m] - h * cp[m])
                };

                let par = ar * p[m][n];
                bt -= ar * t1 * dp[m][n];
                bp += m as f64 * t2 * par;
                br += (n + 1) as f64 * t1 * par;

                // at the geographic poles bp/st is 0/0; use the dedicated recursion
                if st == 0.0 && m == 1 {
                    pole[n] = if n == 1 {
                        pole[n - 1]
                    } else {
                        ct * pole[n - 1] - k[m][n] * pole[n - 2]
                    };
                    bpp += m as f64 * t2 * ar * pole[n];
                }
            }
        }

        let bp = if st == 0.0 { bpp } else { bp / st };

        [-bt * ca - br * sa, bp, bt * sa - br * ca]
    }
}

impl Declination for WorldMagneticModel {
    fn declination(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        decimal_year: f64,
    ) -> Result<f64, DeclinationError> {
        let dt = decimal_year - self.epoch;
        if !(0.0..=VALID_YEARS).contains(&dt) {
            return Err(DeclinationError::OutOfRange {
                year: decimal_year,
                epoch: self.epoch,
            });
        }
        let [bx, by, _] = self.field(latitude_deg, longitude_deg, altitude_m / 1000.0, dt);
        Ok(by.atan2(bx).to_degrees())
    }
}

#[rustfmt::skip]
const MAIN_FIELD: [[f64; 13]; 13] = [
    [0.0, -29438.5, -2445.3, 1351.1, 907.2, -232.6, 69.5, 81.6, 24.0, 5.4, -1.9, 3.1, -2.0],
    [4796.2, -1501.1, 3012.5, -2352.3, 813.7, 360.1, 67.4, -76.1, 8.6, 8.8, -6.5, -1.5, -0.3],
    [-2845.6, -642.0, 1676.6, 1225.6, 120.3, 192.4, 72.8, -6.8, -16.9, 3.1, 0.2, -2.3, 0.4],
    [-115.3, 245.0, -538.3, 581.9, -335.0, -141.0, -129.8, 51.9, -3.2, -3.1, 0.6, 2.1, 1.3],
    [283.4, -188.6, 180.9, -329.5, 70.3, -157.4, -29.0, 15.0, -20.6, 0.6, -0.6, -0.9, -0.9],
    [47.4, 196.9, -119.4, 16.1, 100.1, 4.3, 13.2, 9.3, 13.3, -13.3, 1.7, 0.6, 0.9],
    [-20.7, 33.2, 58.8, -66.5, 7.3, 62.5, -70.9, -2.8, 11.7, -0.1, -0.7, -0.7, 0.1],
    [-54.1, -19.4, 5.6, 24.4, 3.3, -27.5, -2.3, 6.7, -16.0, 8.7, 2.1, 0.2, 0.5],
    [10.2, -18.1, 13.2, -14.6, 16.2, 5.7, -9.1, 2.2, -2.0, -9.1, 2.3, 1.7, -0.4],
    [-21.6, 10.8, 11.7, -6.8, -6.9, 7.8, 1.0, -3.9, 8.5, -10.5, -1.8, -0.2, -0.4],
    [3.3, -0.3, 4.6, 4.4, -7.9, -0.6, -4.1, -2.8, -1.1, -8.7, -3.6, 0.4, 0.2],
    [-0.1, 2.1, -0.7, -1.1, 0.7, -0.2, -2.1, -1.5, -2.5, -2.0, -2.3, 3.5, -0.9],
    [-1.0, 0.5, 1.8, -2.2, 0.3, 0.7, -0.1, 0.3, 0.2, -0.9, -0.2, 0.7, 0.0],
];

#[rustfmt::skip]
const SECULAR_VARIATION: [[f64; 13]; 13] = [
    [0.0, 10.7, -8.6, 3.1, -0.4, -0.2, -0.5, 0.2, 0.0, 0.0, 0.0, 0.0, 0.1],
    [-26.8, 17.9, -3.3, -6.2, 0.8, 0.1, -0.2, -0.2, 0.1, -0.1, 0.0, 0.0, 0.0],
    [-27.1, -13.3, 2.4, -0.4, -9.2, -1.4, -0.6, -0.4, -0.5, -0.1, -0.1, -0.1, 0.0],
    [8.4, -0.4, 2.3, -10.4, 4.0, 0.0, 2.4, 1.3, 0.5, 0.4, 0.3, 0.1, 0.1],
    [-0.6, 5.3, 3.0, -5.3, -4.2, 1.3, -1.1, 0.2, -0.2, -0.5, -0.1, 0.0, -0.1],
    [0.4, 1.6, -1.1, 3.3, 0.1, 3.8, 0.3, -0.4, 0.4, -0.2, -0.1, 0.0, 0.0],
    [0.0, -2.2, -0.7, 0.1, 1.0, 1.3, 1.5, -0.9, 0.2, 0.1, -0.1, 0.0, 0.1],
    [0.7, 0.5, -0.2, -0.1, -0.7, 0.1, 0.1, 0.3, -0.4, 0.0, 0.0, 0.0, 0.0],
    [-0.3, 0.3, 0.3, 0.6, -0.1, -0.2, 0.3, 0.0, 0.3, -0.2, -0.2, 0.0, 0.0],
    [-0.2, -0.1, -0.2, 0.1, 0.1, 0.0, -0.2, 0.4, 0.3, -0.1, -0.1, 0.0, 0.0],
    [0.1, -0.1, 0.0, 0.0, -0.2, 0.1, -0.1, -0.2, 0.1, -0.1, -0.2, -0.1, 0.0],
    [0.0, 0.1, 0.0, 0.1, 0.0, 0.0, 0.1, 0.0, -0.1, 0.0, -0.1, -0.1, 0.0],
    [0.0, 0.0, -0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn known_declinations() {
        let model = WorldMagneticModel::default();
        let boulder = model.declination(40.0, -105.0, 1650.0, 2017.5).unwrap();
        assert_abs_diff_eq!(boulder, 8.29, epsilon = 0.05);
        let paris = model.declination(48.8566, 2.3522, 35.0, 2018.0).unwrap();
        assert_abs_diff_eq!(paris, 0.59, epsilon = 0.05);
        let cape_town = model.declination(-33.9, 18.4, 0.0, 2019.0).unwrap();
        assert_abs_diff_eq!(cape_town, -25.32, epsilon = 0.05);
    }

    #[test]
    fn poles_are_finite() {
        let model = WorldMagneticModel::default();
        for latitude in [90.0, -90.0] {
            for longitude in [0.0, 90.0, -135.0] {
                let d = model.declination(latitude, longitude, 0.0, 2017.0).unwrap();
                assert!(d.is_finite(), "declination at {latitude},{longitude} is {d}");
            }
        }
    }

    #[test]
    fn rejects_years_outside_the_model() {
        let model = WorldMagneticModel::default();
        assert!(matches!(
            model.declination(30.0, -110.0, 700.0, 2014.9),
            Err(DeclinationError::OutOfRange { .. })
        ));
        assert!(model.declination(30.0, -110.0, 700.0, 2020.0).is_ok());
        assert!(model.declination(30.0, -110.0, 700.0, 2025.8).is_err());
    }
}
