//! # Data Transfer Objects (DTOs)
//!
//! Data structures exchanged with the remote service.
//!
//! ## Module Organization
//!
//! - [`auth`] - Sessions, auth-change notifications, user profiles
//! - [`error`] - Structured error bodies
//!
//! ## Example JSON Communication
//!
//! ```text
//! GET /rest/v1/profiles?id=eq.4f1c2a9e-...
//! Authorization: Bearer eyJhbGciOi...
//!
//! HTTP/1.1 200 OK
//! [
//!   {
//!     "id": "4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21",
//!     "full_name": "Ana Souza",
//!     "email": "ana@example.com",
//!     "balance": 1250.75,
//!     "updated_at": "2024-05-01T12:00:00Z"
//!   }
//! ]
//! ```
//!
//! ```text
//! HTTP/1.1 400 Bad Request
//! {
//!   "message": "insufficient funds for withdrawal",
//!   "code": "P0001"
//! }
//! ```

pub mod auth;
pub mod error;

pub use auth::*;
pub use error::*;
