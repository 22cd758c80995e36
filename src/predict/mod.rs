pub mod constants;
mod elements;
mod error;
mod observer;
mod pass_finder;
mod propagator;
mod sun;
mod topo;
mod types;
pub mod vector;

pub use elements::{checksum_valid, load_tle_file, parse_multi_tle, OrbitalElements, TleSet};
pub use error::{ElementsError, PredictError};
pub use observer::ObserverFrame;
pub use pass_finder::{compute_sky_path, find_next_pass};
pub use propagator::{solve_kepler, Satellite, SatelliteState};
pub use sun::{predict_sun, SunState};
pub use topo::{doppler_shift_khz, eclipsed, topocentric, Topocentric};
pub use types::{HorizonEvent, PassEvents, SkyPath, SkyPoint, TransitEvent, SKY_PATH_POINTS};
