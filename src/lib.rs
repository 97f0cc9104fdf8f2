//! Plugsmith - dependency-ordered plugin installer for record-based data engines

pub mod config;
pub mod engine;
pub mod error;
pub mod plugins;

pub use config::Config;
pub use error::{ErrorStatus, PlugsmithError, Result};
