use thiserror::Error;

use crate::time::TimeError;

#[derive(Debug, Error, PartialEq)]
pub enum DeclinationError {
    #[error("magnetic model for epoch {epoch} does not cover year {year:.2}")]
    OutOfRange { year: f64, epoch: f64 },
}

#[derive(Debug, Error, PartialEq)]
pub enum SiteError {
    #[error("latitude {0} outside -90..90")]
    Latitude(f64),
    #[error("longitude {0} outside -180..180")]
    Longitude(f64),
    #[error("altitude {0} m is not plausible")]
    Altitude(f64),
    #[error(transparent)]
    Time(#[from] TimeError),
}
