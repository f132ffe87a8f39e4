//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the client and the backend-as-a-service
//! platform it talks to. All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects for API communication
//!   - **[`dto::auth`]**: Sessions, auth-change notifications and user profiles
//!   - **[`dto::error`]**: Structured failure bodies returned by the remote service
//! - **[`utils`]**: Shared utility functions
//!   - **[`utils::mask_identifier`]**: Shorten user ids and tokens before logging
//!
//! ## Wire Format
//!
//! - Field names use **snake_case**, matching the remote service's column names
//! - Optional fields are omitted from JSON when `None`
//! - All structs implement both `Serialize` and `Deserialize`
//!
//! ## Usage
//!
//! ```rust
//! use shared::dto::auth::UserProfile;
//! use shared::utils::mask_identifier;
//!
//! let profile: UserProfile = serde_json::from_str(
//!     r#"{"id":"4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21","full_name":"Ana"}"#,
//! ).unwrap();
//!
//! assert_eq!(mask_identifier(&profile.id, 4, 4), "4f1c...8a21");
//! ```

pub mod dto;
pub mod utils;

// Wildcard re-exports: shared is a DTO library where all exports are public API
pub use dto::*;
pub use utils::*;
