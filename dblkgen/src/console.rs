// SPDX-License-Identifier: MIT

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Console;

static CONSOLE: Console = Console;

/// Routes library logging to stderr; `verbose` adds debug output.
pub fn init(verbose: bool) {
    if log::set_logger(&CONSOLE).is_ok() {
        log::set_max_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }
}

impl Log for Console {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow(),
            Level::Info => "info".blue(),
            Level::Debug => "debug".green(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[dblkgen] {level} {}", record.args());
    }

    fn flush(&self) {}
}
