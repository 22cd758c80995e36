mod error;
mod parsing;
mod target;

pub use error::TrackerError;
pub use parsing::parse_tle_lines;
pub use target::{DopplerReference, Readiness, Target, TrackingState};
