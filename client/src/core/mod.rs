//! # Core Abstractions
//!
//! Foundational types shared by every component of the client core:
//!
//! - **[`error`]**: [`AppError`], [`RemoteError`] and the [`ErrorPayload`] view
//! - **[`config`]**: [`ClientConfig`] loaded from the environment
//! - **[`service`]**: collaborator traits for dependency injection
//!
//! ## Dependency Injection
//!
//! ```rust,no_run
//! use client::core::service::Providers;
//! use client::services::memory::MemoryBackend;
//!
//! // In production: HTTP + WebSocket adapters from `services::api`
//! // In tests and the demo binary: in-process doubles
//! let backend = MemoryBackend::new();
//! let providers: Providers = backend.providers();
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::ClientConfig;
pub use error::{AppError, ErrorPayload, RemoteError, Result};
pub use service::{
    ChannelHandle, CredentialStore, IdentityProvider, ProcedureService, ProfileCallback,
    ProfileService, Providers, RealtimeProvider,
};
