//! # Logging Infrastructure
//!
//! Structured logging for the client core via `tracing`.
//!
//! ## Features
//!
//! - **File-based logging**: Structured logs to `logs/client-debug.log` (daily rotation)
//! - **Tracked operation spans**: every `run_tracked` call carries an `op_id`
//! - **Panic logging**: panics are written to the log with location and backtrace
//!
//! ## Usage
//!
//! ```rust,no_run
//! // Initialize at startup and keep the guard alive
//! let _log_guard = client::debug::init();
//!
//! // Log with structured fields
//! tracing::info!(screen = "home", "Navigated");
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (e.g., `client=debug,info`)
//! - `CLIENT_LOG_DIR`: Log directory (default: `logs`)
//! - `CLIENT_LOG_STDERR`: Mirror logs to stderr (1=on, 0=off)
//! - `CLIENT_LOG_JSON`: JSON lines in the log file (1=on, 0=off)

pub mod config;
pub mod logger;

pub use config::DebugConfig;
pub use logger::{init, init_with};

/// Check if debug mode is enabled via feature flag
pub fn is_debug_mode() -> bool {
    cfg!(feature = "debug-mode")
}
