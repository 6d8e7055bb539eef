//! Configuration library for fga.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! the process environment (after loading `.env`), then command-line
//! overrides. Loading ends with guard-rail validation that either rejects the
//! configuration or returns warnings for the caller to print.

pub mod constants;
pub mod credentials;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use credentials::{load_app_credentials, load_user_credentials};
pub use loader::{ConfigLoad, ConfigLoader, ConfigOverrides, error::ConfigLoadError};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, FlickrConfig, ProcessorConfig,
};
pub use validation::{
    ConfigGuardRailError, ConfigWarning, ConfigWarnings, ensure_flickr_ready,
};
