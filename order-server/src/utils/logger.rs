//! Logging Infrastructure
//!
//! Structured logging setup for development and production:
//! - Daily rotating application logs (deleted after [`APP_LOG_RETENTION_DAYS`])
//! - Permanent operator logs (never deleted), for events with `target: "operator"`

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, prelude::*};

/// Target for events an operator must see (degraded order numbers, partial settlements)
pub const OPERATOR_TARGET: &str = "operator";

/// Application logs older than this are deleted
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Clean up application log files older than `retention_days`
///
/// Operator logs are never touched.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(retention_days);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // app.YYYY-MM-DD
        let Some(date_part) = name.strip_prefix("app.") else {
            continue;
        };
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(())
}

fn fmt_layer<W>(writer: W, json_format: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(ansi)
        .with_writer(writer);

    if json_format {
        layer.json().with_current_span(true).boxed()
    } else {
        layer.boxed()
    }
}

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug"); `RUST_LOG` takes precedence
/// * `json_format` - JSON lines instead of human-readable output
/// * `log_dir` - Optional directory for file logging (e.g., Some("./work_dir/logs"))
///
/// # Examples
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// order_server::init_logger_with_file("info", false, Some("./work_dir/logs"))?;
/// # Ok(())
/// # }
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = vec![
        fmt_layer(std::io::stdout, json_format, !json_format)
            .with_filter(console_filter)
            .boxed(),
    ];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_log_dir = log_dir.join("app");
        let operator_log_dir = log_dir.join("operator");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&operator_log_dir)?;

        // Rotated daily, subject to cleanup
        let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
        layers.push(
            fmt_layer(std::sync::Mutex::new(app_log), json_format, false)
                .with_filter(EnvFilter::new(level))
                .boxed(),
        );

        // Permanent
        let operator_log = RollingFileAppender::new(Rotation::DAILY, operator_log_dir, "operator");
        layers.push(
            fmt_layer(std::sync::Mutex::new(operator_log), json_format, false)
                .with_filter(filter_fn(|meta| meta.target() == OPERATOR_TARGET))
                .boxed(),
        );

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// Initialize console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Runs every hour
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir, APP_LOG_RETENTION_DAYS) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}
