use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gimbal::error::GimbalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PulseLimits {
    pub axes: [AxisLimits; 2],
}

pub trait LimitStore {
    fn load(&self) -> Result<PulseLimits, GimbalError>;
    fn save(&mut self, limits: &PulseLimits) -> Result<(), GimbalError>;
}

#[derive(Debug, Clone)]
pub struct YamlLimitStore {
    path: PathBuf,
}

impl YamlLimitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LimitStore for YamlLimitStore {
    fn load(&self) -> Result<PulseLimits, GimbalError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&mut self, limits: &PulseLimits) -> Result<(), GimbalError> {
        fs::write(&self.path, serde_yaml::to_string(limits)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLimitStore {
    limits: PulseLimits,
}

impl MemoryLimitStore {
    pub fn new(limits: PulseLimits) -> Self {
        Self { limits }
    }
}

impl LimitStore for MemoryLimitStore {
    fn load(&self) -> Result<PulseLimits, GimbalError> {
        Ok(self.limits)
    }

    fn save(&mut self, limits: &PulseLimits) -> Result<(), GimbalError> {
        self.limits = *limits;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sat-pointer-{}-{}.yaml", name, std::process::id()))
    }

    #[test]
    fn yaml_store_round_trips_through_file() {
        let path = temp_path("limits");
        let mut store = YamlLimitStore::new(&path);
        let limits = PulseLimits {
            axes: [
                AxisLimits { min: 600, max: 2400 },
                AxisLimits { min: 1000, max: 2000 },
            ],
        };
        store.save(&limits).unwrap();
        assert_eq!(store.load().unwrap(), limits);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_or_garbled_file_is_an_error() {
        let path = temp_path("garbled");
        let store = YamlLimitStore::new(&path);
        assert!(matches!(store.load(), Err(GimbalError::StoreIo(_))));
        fs::write(&path, "axes: [not, numbers]").unwrap();
        assert!(matches!(store.load(), Err(GimbalError::StoreFormat(_))));
        let _ = fs::remove_file(&path);
    }
}
