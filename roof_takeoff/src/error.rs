//! Error types shared across the crate.

use std::io;

use thiserror::Error;

/// Failure to build any report model from the supplied export.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not a well-formed XML document.
    #[error("malformed export document: {0}")]
    Xml(#[from] roxmltree::Error),
    /// The export file could not be read.
    #[error("unable to read export: {0}")]
    Io(#[from] io::Error),
}

/// Failure to load or store a [`crate::ViewerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to access config file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    /// The file parsed but holds values the viewer cannot work with.
    #[error("invalid config value: {0}")]
    Invalid(String),
}
