//! # Services Module
//!
//! Implementations of the collaborator traits in [`crate::core::service`].
//!
//! ## Module Overview
//!
//! ```text
//! services/
//! ├── api/       - HTTP + WebSocket adapters for the backend-as-a-service
//! │                (identity, profiles, remote procedures, realtime)
//! └── memory.rs  - In-process backend for the demo binary and tests
//!                  (failure injection, call counters)
//! ```
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Client core                         │
//! │   SessionGuard · FeedbackController · App               │
//! │                         │                               │
//! │                 core::service::Providers                │
//! └───────────┬─────────────────────────────┬───────────────┘
//!             │                             │
//!             │ HTTP/JSON                   │ WebSocket
//!             ▼                             ▼
//! ┌─────────────────────────┐   ┌─────────────────────────────┐
//! │  REST gateway           │   │  Realtime service           │
//! │                         │   │                             │
//! │  /auth/v1/user          │   │  subscribe profiles:<id>    │
//! │  /auth/v1/token         │   │  profile_update frames      │
//! │  /auth/v1/logout        │   │                             │
//! │  /rest/v1/profiles      │   │                             │
//! │  /rest/v1/rpc/{name}    │   │                             │
//! └─────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every adapter returns [`crate::core::error::RemoteError`]:
//! - Network errors: "Network error: {details}"
//! - Parse errors: "Failed to parse response: {details}"
//! - Service errors: decoded from the JSON error body (`message`, `code`)
//!
//! Raw messages are never shown as-is; the feedback layer sanitizes them.

pub mod api;
pub mod memory;
