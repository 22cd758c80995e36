use thiserror::Error;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("bus transaction failed: {0}")]
    Bus(String),
    #[error("device did not answer within {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum GimbalError {
    #[error("no servo controller")]
    NoController,
    #[error("no motor axis {0}")]
    NoSuchAxis(usize),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error("pulse limit store: {0}")]
    StoreIo(#[from] std::io::Error),
    #[error("pulse limit store format: {0}")]
    StoreFormat(#[from] serde_yaml::Error),
}
