use thiserror::Error;

use crate::time::TimeError;

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("element set needs a name line and two data lines")]
    MissingLines,
    #[error("data line {0} fails its checksum")]
    Checksum(u8),
    #[error("malformed element set: {0}")]
    Malformed(String),
    #[error("element epoch unusable: {0}")]
    Epoch(#[from] TimeError),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Kepler's equation did not converge (M = {mean_anomaly:.6} rad, e = {eccentricity:.6})")]
    NotConverged {
        mean_anomaly: f64,
        eccentricity: f64,
    },
    #[error("element set file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error(transparent)]
    Elements(#[from] ElementsError),
}
