//! JSON output formatter for machine-readable results.

use super::formatter::FormatRow;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use polyarc_core::ArchiveEntry;
use polyarc_core::formats::common::unix_seconds;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

/// Serialized shape of one entry.
#[derive(Serialize)]
struct EntryOutput<'a> {
    index: usize,
    level: usize,
    path: &'a str,
    is_folder: bool,
    is_encrypted: bool,
    packed_size: u64,
    raw_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<u64>,
    attributes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    properties: BTreeMap<&'a str, &'a str>,
}

impl<'a> From<&'a ArchiveEntry> for EntryOutput<'a> {
    fn from(entry: &'a ArchiveEntry) -> Self {
        Self {
            index: entry.index(),
            level: entry.level(),
            path: entry.path(),
            is_folder: entry.is_folder(),
            is_encrypted: entry.is_encrypted(),
            packed_size: entry.packed_size(),
            raw_size: entry.raw_size(),
            hash: entry.hash(),
            modified: entry.modified().and_then(unix_seconds),
            attributes: entry.attributes(),
            user: entry.user(),
            group: entry.group(),
            comment: entry.comment(),
            properties: entry
                .properties()
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_entries(&self, archive: &Path, entries: &[ArchiveEntry], _long: bool, _human_readable: bool) -> Result<()> {
        #[derive(Serialize)]
        struct ListOutput<'a> {
            archive: String,
            total_entries: usize,
            entries: Vec<EntryOutput<'a>>,
        }

        let data = ListOutput {
            archive: archive.display().to_string(),
            total_entries: entries.len(),
            entries: entries.iter().map(EntryOutput::from).collect(),
        };

        Self::output(&JsonOutput::success("list", data))
    }

    fn format_outcome(&self, operation: &str, archive: &Path, detail: &str) -> Result<()> {
        #[derive(Serialize)]
        struct OutcomeOutput {
            archive: String,
            detail: String,
        }

        let data = OutcomeOutput {
            archive: archive.display().to_string(),
            detail: detail.to_string(),
        };

        Self::output(&JsonOutput::success(operation.to_lowercase(), data))
    }

    fn format_formats(&self, rows: &[FormatRow]) -> Result<()> {
        Self::output(&JsonOutput::success("formats", rows))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error("unknown", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
