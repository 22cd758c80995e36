mod axis;
mod calibration;
mod controller;
mod error;
mod hardware;
mod store;

pub use axis::{az_distance, MotorAxis};
pub use calibration::CalibrationStep;
pub use controller::{
    swing_to_opposite_side, Gimbal, GimbalEvent, LimitEscape, LimitKind, AXIS_COUNT,
    CALIBRATION_FRACTION, SETTLE_DEG, UPDATE_PERIOD_MS,
};
pub use error::{GimbalError, HardwareError};
pub use hardware::{
    write_sensor_report, CalibrationQuality, Orientation, OrientationSensor, ServoDriver,
};
pub use store::{AxisLimits, LimitStore, MemoryLimitStore, PulseLimits, YamlLimitStore};
