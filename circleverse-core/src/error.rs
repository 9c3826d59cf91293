use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the simulation engine.
///
/// Every error is raised synchronously by the call that caused it; the state
/// the call would have mutated is left untouched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported shock kind: {0:?}")]
    UnsupportedShockKind(String),

    #[error("Export to {} failed: {source}", path.display())]
    ExportFailure {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateIdentifier { kind: &'static str, id: String },

    #[error("Unknown town: {0}")]
    UnknownTown(String),

    #[error("Unknown household: {0}")]
    UnknownHousehold(String),

    #[error("Cannot read {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scenario: {0}")]
    Scenario(#[from] serde_json::Error),
}

/// Underlying cause of an [`EngineError::ExportFailure`].
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Frame(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateIdentifier {
            kind,
            id: id.into(),
        }
    }
}
