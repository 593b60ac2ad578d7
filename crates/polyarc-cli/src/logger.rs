//! Minimal stderr backend for the `log` facade.

use console::style;
use log::Level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => style("error").red().bold(),
            Level::Warn => style("warn").yellow().bold(),
            Level::Info => style("info").green(),
            Level::Debug => style("debug").blue(),
            Level::Trace => style("trace").dim(),
        };
        eprintln!("[{level} {}] {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Level for the given verbosity flags.
pub const fn level_for(verbose: bool, quiet: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Off
    } else {
        LevelFilter::Warn
    }
}

/// Installs the logger; a second call leaves the first logger in place.
pub fn init(verbose: bool, quiet: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_for(verbose, quiet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(true, false), LevelFilter::Debug);
        assert_eq!(level_for(false, false), LevelFilter::Warn);
        assert_eq!(level_for(false, true), LevelFilter::Off);
    }
}
