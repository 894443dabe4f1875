use std::env;
use std::io::Write;

use log::{self, LevelFilter, Metadata, Record};

/// Environment variable holding the log level (`error` .. `trace`, or `off`).
pub const LOG_ENV: &str = "BATTLESHIP_LOG";

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    // stderr keeps log lines out of the client's prompt handling on stdout.
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr(),
                "{} [{}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: SimpleLogger = SimpleLogger;

fn level_from(value: Option<String>, default: LevelFilter) -> LevelFilter {
    value.and_then(|lvl| lvl.parse().ok()).unwrap_or(default)
}

/// Initialize logging with a level taken from the `BATTLESHIP_LOG` environment
/// variable, falling back to `default` if the variable is unset or invalid.
/// Calling it again is a no-op.
pub fn init_logging(default: LevelFilter) {
    let level = level_from(env::var(LOG_ENV).ok(), default);
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
