//! Error types for Plugsmith
//!
//! This module defines all error types used throughout the install pipeline.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Discovery, parse, dependency and resolution errors abort a run before any
//! record is created. Install errors are caught per file by the installer and
//! recorded in its report instead of propagating.

use thiserror::Error;

/// The primary error type for Plugsmith operations.
#[derive(Error, Debug)]
pub enum PlugsmithError {
    /// Plugin tree discovery failures (missing root, no manifests, etc.)
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Malformed plugin descriptors, manifests or file layout
    #[error("Parse error: {0}")]
    Parse(String),

    /// A manifest depends on a target no manifest provides
    #[error("Dependency error: '{referencer}' depends on unknown target '{missing}'")]
    MissingDependency { missing: String, referencer: String },

    /// The manifest dependency graph contains a cycle
    #[error("Dependency error: cycle detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// A placeholder could not be resolved in strict mode
    #[error("Resolution error: no variable named '{key}'")]
    Resolution { key: String },

    /// Record creation or content read failures during installation
    #[error("Install error: {0}")]
    Install(String),

    /// Invalid scaffold template locators
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration-related errors (invalid config file, bad env values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operations that are declared but intentionally not available
    #[error("Not implemented: {0}")]
    Unimplemented(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Classification consumed by the command-line layer to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// The plugin tree, its descriptors or the invocation were invalid.
    InputValidation,
    /// Anything else: I/O, network, engine failures, unsupported operations.
    Unexpected,
}

impl PlugsmithError {
    /// Classify this error for reporting.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::Discovery(_)
            | Self::Parse(_)
            | Self::MissingDependency { .. }
            | Self::DependencyCycle(_)
            | Self::Resolution { .. }
            | Self::Template(_)
            | Self::Config(_) => ErrorStatus::InputValidation,
            Self::Install(_)
            | Self::Unimplemented(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_) => ErrorStatus::Unexpected,
        }
    }

    /// Whether this error means the engine could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// A specialized `Result` type for Plugsmith operations.
pub type Result<T> = std::result::Result<T, PlugsmithError>;
