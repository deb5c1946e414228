use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::utils::time::parse_timezone;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | Database and log directory |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | MESSAGE_TCP_PORT | 8081 | TCP subscriber port |
/// | TIMEZONE | Europe/Madrid | Business timezone (order number day) |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | JSON log lines |
/// | EVENT_CHANNEL_CAPACITY | 1024 | Per-topic broadcast buffer |
/// | SEQUENCE_RETRY_ATTEMPTS | 3 | Counter increment attempts before fallback |
/// | SEQUENCE_RETRY_BASE_MS | 10 | First backoff delay, doubled per attempt |
/// | ALLOW_DEGRADED_ORDER_NUMBERS | true | Issue `T`-namespace numbers when the counter is down |
/// | RECONCILE_INTERVAL_SECS | 15 | Poll interval for queue followers |
/// | INCLUDE_PREPARING_IN_KITCHEN | true | Kitchen queue also lists `preparing` |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/orders HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory (database, logs)
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// TCP subscriber port
    pub message_tcp_port: u16,
    /// Business timezone
    pub timezone: Tz,
    pub log_level: String,
    pub log_json: bool,
    /// Broadcast buffer per topic
    pub event_channel_capacity: usize,
    pub sequence_retry_attempts: u32,
    pub sequence_retry_base_ms: u64,
    pub allow_degraded_order_numbers: bool,
    pub reconcile_interval_secs: u64,
    pub include_preparing_in_kitchen: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load from environment variables, falling back to defaults
    ///
    /// An unparseable `TIMEZONE` is logged and replaced by the default.
    pub fn from_env() -> Self {
        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|name| match parse_timezone(&name) {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!("{}, using Europe/Madrid", e);
                    None
                }
            })
            .unwrap_or(chrono_tz::Europe::Madrid);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: env_or("HTTP_PORT", 3000),
            message_tcp_port: env_or("MESSAGE_TCP_PORT", 8081),
            timezone,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            event_channel_capacity: env_or("EVENT_CHANNEL_CAPACITY", 1024),
            sequence_retry_attempts: env_or("SEQUENCE_RETRY_ATTEMPTS", 3),
            sequence_retry_base_ms: env_or("SEQUENCE_RETRY_BASE_MS", 10),
            allow_degraded_order_numbers: env_or("ALLOW_DEGRADED_ORDER_NUMBERS", true),
            reconcile_interval_secs: env_or("RECONCILE_INTERVAL_SECS", 15),
            include_preparing_in_kitchen: env_or("INCLUDE_PREPARING_IN_KITCHEN", true),
        }
    }

    /// Override work dir and ports
    ///
    /// Mostly for tests
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// `<work_dir>/database/orders.redb`
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("orders.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    /// Create `database/` and `logs/` under the work dir
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
