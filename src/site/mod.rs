mod error;
mod fix;
mod magnetic;
mod site;

pub use error::{DeclinationError, SiteError};
pub use fix::{Fix, FixSource, SourceStatus, SourceUpdate, STALE_FIX_MS};
pub use magnetic::{Declination, WorldMagneticModel};
pub use site::{Site, SiteChange};
