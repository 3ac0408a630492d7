//! Settings for promptlift: engine timings, the pending-insertion TTL,
//! the rewrite endpoint, logging, and user-supplied platform profiles.
//!
//! Everything has a default, so an empty `promptlift.toml` (or none at all)
//! is a working configuration.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, Finding, ValidationResult};
