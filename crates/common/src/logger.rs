use crate::error::BookDigestError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log file name inside the configured log directory
pub const LOG_FILE_NAME: &str = "bookdigest.log";

/// Initialize console and file logging
///
/// Console output goes to stderr so stdout stays free for batch results.
/// Every event is also appended to `<log_dir>/bookdigest.log` without colors.
///
/// # Arguments
/// * `log_dir` - Directory for the log file, created if missing
/// * `log_level` - Fallback level when `RUST_LOG` is unset
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), BookDigestError> {
    let (log_file, log_file_path) = open_log_file(log_dir)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(build_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(build_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BookDigestError::config(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!(
        "Logging initialized: level={}, log_file={}",
        log_level,
        log_file_path.display()
    );

    Ok(())
}

/// Stderr-only logging for short-lived commands and tests
pub fn setup_console_logging(log_level: &str) -> Result<(), BookDigestError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_env_filter(build_filter(log_level))
        .try_init()
        .map_err(|e| BookDigestError::config(format!("Failed to install subscriber: {}", e)))?;

    Ok(())
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), BookDigestError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        BookDigestError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            BookDigestError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}

/// `RUST_LOG` wins over the configured level; unknown levels mean INFO
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = parse_log_level(log_level).unwrap_or(Level::INFO);
        EnvFilter::new(level.as_str())
    })
}

/// Parse a level name, accepting `warning` as an alias for `warn`
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_log_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_log_level(" Warning "), Some(Level::WARN));
        assert_eq!(parse_log_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = std::env::temp_dir().join(format!("bookdigest-log-{}", std::process::id()));
        let (_file, path) = open_log_file(&dir).unwrap();

        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), LOG_FILE_NAME);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
