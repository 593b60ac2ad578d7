//! Output formatter trait for CLI results.

use anyhow::Result;
use polyarc_core::ArchiveEntry;
use serde::Serialize;
use std::path::Path;

/// One claimed extension and who handles it.
#[derive(Debug, Clone, Serialize)]
pub struct FormatRow {
    pub extension: String,
    pub reader: Option<String>,
    pub writer: Option<String>,
    pub compressor_only: bool,
}

/// Common output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format a normalized listing
    fn format_entries(&self, archive: &Path, entries: &[ArchiveEntry], long: bool, human_readable: bool) -> Result<()>;

    /// Format a successful operation on `archive`
    fn format_outcome(&self, operation: &str, archive: &Path, detail: &str) -> Result<()>;

    /// Format the registry's format table
    fn format_formats(&self, rows: &[FormatRow]) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
