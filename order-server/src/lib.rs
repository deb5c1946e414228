//! Order Server - authoritative order lifecycle for a restaurant
//!
//! # Architecture
//!
//! - **Orders** (`orders`): redb-backed order records, per-day order numbers,
//!   conditional status transitions, role queues, per-table checkout
//! - **Event bus** (`message`): topic-scoped fan-out of committed changes,
//!   in-process and over TCP
//! - **HTTP API** (`api`): axum routes for every operation
//!
//! # Module layout
//!
//! ```text
//! order-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── orders/        # storage, sequence, machine, manager, queues, checkout, follower, sync
//! ├── message/       # event bus, transports, TCP subscriber server
//! ├── services/      # bus service, catalog, payment gateway
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging, time
//! ```

pub mod api;
pub mod core;
pub mod message;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export common types
pub use core::{Config, Server, ServerState};
pub use message::{BusMessage, EventBus, EventType};
pub use orders::{CheckoutMerger, OrderStorage, OrdersManager, QueueFollower};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Load `.env`, read the configuration and start logging
///
/// Logs go to stdout and to `<work_dir>/logs`.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        Some(&log_dir.to_string_lossy()),
    )?;

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
  ___          _              ___
 / _ \ _ _ __| |___ _ _ ___ / __| ___ _ ___ _____ _ _
| (_) | '_/ _` / -_) '_(_-< \__ \/ -_) '_\ V / -_) '_|
 \___/|_| \__,_\___|_| /__/ |___/\___|_|  \_/\___|_|
    "#
    );
}
