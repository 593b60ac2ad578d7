//! Human-readable output formatter with colors and styling.

use super::formatter::FormatRow;
use super::formatter::OutputFormatter;
use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use console::Term;
use console::style;
use polyarc_core::ArchiveEntry;
use std::path::Path;
use std::time::SystemTime;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn format_time(time: Option<SystemTime>) -> String {
        time.map_or_else(
            || "-".repeat(16),
            |time| DateTime::<Utc>::from(time).format("%Y-%m-%d %H:%M").to_string(),
        )
    }

    fn type_char(entry: &ArchiveEntry) -> char {
        if entry.is_folder() {
            'd'
        } else if entry.symlink_target().is_some() {
            'l'
        } else if entry.is_nested_archive() {
            'a'
        } else {
            '-'
        }
    }

    fn display_path(&self, entry: &ArchiveEntry) -> String {
        let mut path = entry.path().to_string();
        if entry.is_folder() {
            path.push('/');
        }
        if let Some(target) = entry.symlink_target() {
            path.push_str(" -> ");
            path.push_str(target);
        }
        if self.use_colors && entry.is_folder() {
            style(path).blue().bold().to_string()
        } else {
            path
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_entries(&self, _archive: &Path, entries: &[ArchiveEntry], long: bool, human_readable: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !long {
            for entry in entries {
                let _ = self.term.write_line(&self.display_path(entry));
            }
            return Ok(());
        }

        let mut total_size = 0_u64;
        let mut files = 0_usize;
        for entry in entries {
            let size = |bytes: u64| {
                if human_readable {
                    Self::format_size(bytes)
                } else {
                    bytes.to_string()
                }
            };
            let mode = match entry.attributes() & 0o7777 {
                0 => "-".to_string(),
                bits => format!("{bits:o}"),
            };
            let lock = if entry.is_encrypted() { '*' } else { ' ' };

            let mut line = format!(
                "{}{:<5}{lock} {:>10} {:>10}  {}  {:<8}  {}",
                Self::type_char(entry),
                mode,
                size(entry.raw_size()),
                size(entry.packed_size()),
                Self::format_time(entry.modified()),
                entry.hash().unwrap_or("-"),
                self.display_path(entry),
            );
            if self.verbose {
                if let (Some(user), Some(group)) = (entry.user(), entry.group()) {
                    line.push_str(&format!("  ({user}:{group})"));
                }
                if let Some(comment) = entry.comment() {
                    line.push_str(&format!("  # {comment}"));
                }
            }
            let _ = self.term.write_line(&line);

            if !entry.is_folder() {
                files += 1;
                total_size += entry.raw_size();
            }
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} entries, {} files, {}",
            Self::format_number(entries.len()),
            Self::format_number(files),
            Self::format_size(total_size)
        ));

        Ok(())
    }

    fn format_outcome(&self, operation: &str, archive: &Path, detail: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let headline = format!("{operation}: {}", archive.display());
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {headline}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(&headline);
        }
        if !detail.is_empty() {
            let _ = self.term.write_line(&format!("  {detail}"));
        }

        Ok(())
    }

    fn format_formats(&self, rows: &[FormatRow]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let _ = self
            .term
            .write_line(&format!("{:<8} {:<12} {:<12} {}", "EXT", "READ", "WRITE", "KIND"));
        for row in rows {
            let kind = if row.compressor_only {
                "compressor"
            } else {
                "archive"
            };
            let _ = self.term.write_line(&format!(
                "{:<8} {:<12} {:<12} {kind}",
                row.extension,
                row.reader.as_deref().unwrap_or("-"),
                row.writer.as_deref().unwrap_or("-"),
            ));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = term.write_line(&format!("WARNING: {message}"));
        }
    }
}
