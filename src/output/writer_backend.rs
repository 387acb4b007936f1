//! Writer backend trait for dip candidate tables
//!
//! Every backend persists the rows together with the scan parameters that
//! produced them, so an artifact is self-describing.

use crate::detection_core::{CandidateTable, ScanParameters};
use async_trait::async_trait;

/// How a backend treats an existing artifact; fixed when the writer is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

impl WriteMode {
    pub fn from_append_flag(append: bool) -> Self {
        if append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Overwrite => "overwrite",
            WriteMode::Append => "append",
        }
    }
}

#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
    /// Appending to an artifact written with different scan parameters
    ParameterMismatch { field: String, existing: String, requested: String },
    MalformedArtifact(String),
}

impl From<std::io::Error> for WriterError {
    fn from(err: std::io::Error) -> Self {
        WriterError::Io(err)
    }
}

impl From<serde_json::Error> for WriterError {
    fn from(err: serde_json::Error) -> Self {
        WriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for WriterError {
    fn from(err: rusqlite::Error) -> Self {
        WriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "IO error: {}", e),
            WriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            WriterError::Database(e) => write!(f, "Database error: {}", e),
            WriterError::ParameterMismatch { field, existing, requested } => write!(
                f,
                "Cannot append: artifact was written with {} = {}, this run uses {}",
                field, existing, requested
            ),
            WriterError::MalformedArtifact(reason) => write!(f, "Malformed artifact: {}", reason),
        }
    }
}

impl std::error::Error for WriterError {}

/// Backend trait for persisting candidate tables
#[async_trait]
pub trait CandidateWriterBackend: Send {
    /// Persist `table` with the parameters that produced it
    async fn write_table(
        &mut self,
        table: &CandidateTable,
        params: &ScanParameters,
    ) -> Result<(), WriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
