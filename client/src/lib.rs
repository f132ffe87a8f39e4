//! # Client Core - Library Root
//!
//! Session lifecycle and operation feedback core of a mobile-first finance client
//! (deposits, withdrawals, transfers, investment funds, a shop). Business rules live in
//! remote procedures on a backend-as-a-service; this crate owns the state machines that
//! sit between the screens and that backend.
//!
//! ## Features
//!
//! - **Operation feedback**: one shared loading/success/error indicator for every
//!   remote call, with auto-revert and retry backoff
//! - **Safe error disclosure**: raw service errors are mapped to bounded human messages
//! - **Session lifecycle**: profile cache, realtime subscription and inactivity timeout
//!   kept in lock-step with the authenticated session
//! - **Navigation**: central authentication gating and deferred heavy screens
//!
//! ## Architecture
//!
//! ### Technology Stack
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              client (this crate)                       │
//! ├────────────────────────────────────────────────────────┤
//! │  Tokio             - Timers, tasks, watch channels     │
//! │  Reqwest           - REST gateway client               │
//! │  tokio-tungstenite - Realtime WebSocket channel        │
//! │  tracing           - Structured logging                │
//! └────────────────────────────────────────────────────────┘
//!          │                              │
//!          │ HTTP                         │ WebSocket
//!          ▼                              ▼
//! ┌─────────────────┐          ┌─────────────────────────┐
//! │  REST gateway   │          │   Realtime service      │
//! │  auth · rpc     │          │   profile row changes   │
//! └─────────────────┘          └─────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - **app**: [`App`] orchestrator, screens and the navigation dispatcher
//! - **core**: errors, configuration and collaborator traits
//! - **feedback**: [`feedback::FeedbackController`] and the error sanitizer
//! - **session**: [`session::SessionGuard`] and the inactivity timer
//! - **services**: HTTP/WebSocket adapters and the in-memory backend
//! - **debug**: logging setup
//!
//! ### Module Dependency Graph
//!
//! ```text
//! main.rs
//!   │
//!   └── app (orchestrator, navigation)
//!       ├── session (lifecycle, inactivity)
//!       │   └── feedback (surfacing failures)
//!       ├── feedback (run_tracked, sanitizer)
//!       └── core::service ◀── services::{api, memory}
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use client::app::{App, Screen};
//! use client::core::config::ClientConfig;
//! use client::services::memory::MemoryBackend;
//! use serde_json::json;
//!
//! # async fn demo() -> client::Result<()> {
//! let backend = MemoryBackend::new();
//! let app = App::new(backend.providers(), ClientConfig::default());
//! app.start().await;
//!
//! app.navigate(Screen::Deposit, None).await;
//! app.call_procedure("request_deposit", json!({ "amount": 50.0 }), Some("Deposit requested"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Timing behavior is tested on Tokio's paused clock:
//! ```bash
//! cargo test -p client
//! ```

pub mod app;
pub mod core;
pub mod debug;
pub mod feedback;
pub mod services;
pub mod session;

pub use app::{App, Screen};
pub use crate::core::{AppError, Result};
