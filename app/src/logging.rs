//! Logging setup for Perch binaries
//!
//! Each binary writes its own size-rotated file under
//! `<config_dir>/perch/logs/perch-<component>.log`. The terminal only sees
//! warnings and errors so log lines never interleave with REPL output.
//!
//! `RUST_LOG` replaces the default directives. `DEBUG_LOGGING=1` raises the
//! perch crates from info to debug.

use std::io;
use std::path::{Path, PathBuf};

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const PERCH_CRATES: [&str; 4] = ["perch_app", "perch_core", "perch_overlay", "perch_cli"];

/// A log file is rotated once it reaches this size
const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;

/// Rotated files kept next to the live one (`.1` to `.3`)
const KEPT_LOGS: usize = 3;

/// Where and how verbosely a binary logs
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Short binary name, used in the file name
    pub component: String,
    /// Log directory; `None` logs to the terminal only
    pub dir: Option<PathBuf>,
    pub debug: bool,
}

impl LogConfig {
    pub fn from_env(component: &str) -> Self {
        Self {
            component: component.to_string(),
            dir: dirs::config_dir().map(|dir| dir.join("perch").join("logs")),
            debug: std::env::var_os("DEBUG_LOGGING").is_some(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("perch-{}.log", self.component)
    }

    /// Default filter: perch crates at info (or debug), dependencies at warn
    pub fn directives(&self) -> String {
        let level = if self.debug { "debug" } else { "info" };
        PERCH_CRATES
            .iter()
            .fold(String::from("warn"), |acc, krate| format!("{acc},{krate}={level}"))
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the binary. Returns `None` when file logging is unavailable; the
/// terminal then receives the full filtered output instead.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let Some(dir) = config.dir.as_deref() else {
        init_terminal_only(config);
        return None;
    };

    let (appender, log_path) = match open_appender(dir, &config.file_name()) {
        Ok(opened) => opened,
        Err(e) => {
            // Subscriber not installed yet
            eprintln!("File logging unavailable in {}: {e}", dir.display());
            init_terminal_only(config);
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(config.filter());

    let terminal_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(terminal_layer)
        .init();

    tracing::info!(
        log_file = %log_path.display(),
        component = %config.component,
        debug = config.debug,
        "Perch logging initialized"
    );

    Some(guard)
}

fn open_appender(dir: &Path, file_name: &str) -> io::Result<(BasicRollingFileAppender, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let appender = BasicRollingFileAppender::new(
        &path,
        RollingConditionBasic::new().max_size(MAX_LOG_BYTES),
        KEPT_LOGS,
    )?;
    Ok((appender, path))
}

fn init_terminal_only(config: &LogConfig) {
    let terminal_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_filter(config.filter());

    tracing_subscriber::registry().with(terminal_layer).init();

    tracing::info!(component = %config.component, "Perch logging initialized (terminal only)");
}
