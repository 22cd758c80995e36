mod clock;
mod epoch;
mod error;

pub use clock::{EpochClock, ManualMonotonic, Monotonic, SystemMonotonic};
pub use epoch::{CalendarTime, Epoch, SECONDS_PER_DAY};
pub use error::TimeError;
