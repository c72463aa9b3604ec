use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;
use crate::utils::expand_tilde;

const LOG_FILE_PREFIX: &str = "gemchat.log";
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system.
///
/// The console layer writes to stderr so log lines never interleave with the
/// chat transcript on stdout. When the log directory cannot be used, logging
/// continues on the console only and `None` is returned. Otherwise keep the
/// returned guard alive until exit or the file writer drops buffered lines.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());

    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_level_str));

    for (module, level) in &config.overrides {
        if let Ok(directive) = format!("{}={}", module, level).parse() {
            filter = filter.add_directive(directive);
        } else {
            eprintln!("Invalid log directive: {}={}", module, level);
        }
    }

    let format_str = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let is_json = format_str.eq_ignore_ascii_case("json");

    let log_dir = expand_tilde(&config.dir);
    let (log_writer, guard) = match file_writer(&log_dir) {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    let console_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let file_layer = log_writer.map(|writer| {
        if is_json {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        }
    });

    if let Err(e) = Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
    }

    if guard.is_some() {
        if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
            eprintln!("Failed to clean up old logs: {}", e);
        }
    }

    guard
}

/// Daily rolling writer producing gemchat.log.YYYY-MM-DD in `dir`
fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!(
                "Cannot write logs to {}: {}; logging to the console only",
                dir.display(),
                e
            );
            None
        }
    }
}

/// Remove gemchat log files older than `days` days
fn cleanup_old_logs(dir: &Path, days: u64) -> std::io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let now = std::time::SystemTime::now();
    let threshold = std::time::Duration::from_secs(days * 24 * 3600);

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > threshold) {
            if let Err(e) = std::fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }
    Ok(())
}
