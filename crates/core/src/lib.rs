pub mod api;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod registry;
pub mod store;

pub use api::{execute, SpotRequest, SpotResponse, SpotVerb};
pub use clock::{format_day, parse_day, Clock, DateClock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::spot::{composite_key, Spot, NOT_AVAILABLE};
pub use errors::{ErrorKind, RegistryError};
pub use registry::Registry;
pub use store::{SpotMap, Store};
