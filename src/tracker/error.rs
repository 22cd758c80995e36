use thiserror::Error;

use crate::predict::{ElementsError, PredictError};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Can not track without a gimbal!")]
    NoGimbal,
    #[error("Can not track without a position sensor!")]
    NoSensor,
    #[error("First Upload a TLE or override Target Az and El!")]
    NoTarget,
    #[error("Uploaded TLE needs a name line and two data lines!")]
    InvalidTleFormat,
    #[error("Uploaded TLE is invalid!")]
    InvalidTle(#[from] ElementsError),
    #[error("prediction failed: {0}")]
    Predict(#[from] PredictError),
}
