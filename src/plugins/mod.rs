//! Plugin installation for Plugsmith
//!
//! A plugin is a directory tree of JSON records. The root holds a
//! `plugin.json` descriptor; every directory holding a `manifest.json` is one
//! group of records bound for a single target collection, optionally
//! depending on other groups.
//!
//! # Architecture
//!
//! - **discovery**: Walks the plugin root and classifies paths
//! - **parser**: Builds the content tree (`PluginWrapper`) from discovered paths
//! - **dependency**: Rejects unknown dependency targets and cycles
//! - **variables**: `{{placeholder}}` substitution in JSON values
//! - **reader**: `ContentReader` trait and the filesystem reader
//! - **installer**: Dependency-ordered, failure-isolating record insertion
//! - **manager**: Runs the stages above for one request
//! - **json_path**: `$.a[0].b` locators for scaffold templates
//!
//! # Plugin Directory Structure
//!
//! ```text
//! crm-plugin/
//! ├── plugin.json
//! ├── entities/
//! │   ├── manifest.json      {"target": "entities"}
//! │   └── customers.json
//! ├── roles/
//! │   ├── manifest.json      {"target": "roles"}
//! │   └── defaults.json
//! └── customers/
//!     ├── manifest.json      {"target": "customers", "dependencies": ["roles"]}
//!     └── seed.json
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use plugsmith::config::Config;
//! use plugsmith::engine::HttpEngineClient;
//! use plugsmith::plugins::PluginManager;
//!
//! # async fn run() -> plugsmith::error::Result<()> {
//! let config = Config::load(None)?;
//! let client = Arc::new(HttpEngineClient::new(&config.engine)?);
//! let manager = PluginManager::new(client, config.install);
//!
//! let report = manager.install(Path::new("./crm-plugin")).await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod dependency;
pub mod discovery;
pub mod installer;
pub mod json_path;
pub mod manager;
pub mod parser;
pub mod reader;
pub mod types;
pub mod variables;

pub use dependency::check;
pub use discovery::discover;
pub use installer::{InstallFailure, InstallReport, Installer};
pub use json_path::{apply_values, get_path, set_path};
pub use manager::PluginManager;
pub use parser::parse;
pub use reader::{ContentReader, FsContentReader};
pub use types::{PluginConfig, PluginContent, PluginManifest, PluginPath, PluginWrapper};
pub use variables::{placeholders, resolve};
