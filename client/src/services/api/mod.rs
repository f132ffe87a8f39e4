//! # Backend API Module
//!
//! Adapters for a PostgREST-style backend-as-a-service.
//!
//! ## Module Structure
//!
//! ```text
//! api/
//! ├── mod.rs       - Module exports and provider wiring
//! ├── client.rs    - ApiClient struct, token storage, error decoding
//! ├── auth.rs      - Identity endpoints (/auth/v1: user, token, logout)
//! ├── profile.rs   - Profile row lookup (/rest/v1/profiles)
//! ├── rpc.rs       - Remote procedures (/rest/v1/rpc/{name})
//! └── realtime.rs  - WebSocket row-change channel
//! ```

pub mod auth;
pub mod client;
pub mod profile;
pub mod realtime;
pub mod rpc;

use std::sync::Arc;

pub use client::ApiClient;
pub use realtime::RealtimeClient;

use crate::core::config::ClientConfig;
use crate::core::error::Result;
use crate::core::service::Providers;

/// Build network-backed collaborators from configuration.
///
/// Returns the [`ApiClient`] as well so the caller can sign in through it.
pub fn connect(config: &ClientConfig) -> Result<(Arc<ApiClient>, Providers)> {
    config.validate()?;

    let api = Arc::new(ApiClient::new(config)?);
    let realtime = Arc::new(RealtimeClient::new(config));

    tracing::info!(
        api_base_url = %config.api_base_url,
        realtime_url = %config.realtime_url,
        "Backend adapters configured"
    );

    let providers = Providers {
        identity: api.clone(),
        profiles: api.clone(),
        realtime,
        credentials: api.clone(),
        procedures: api.clone(),
    };
    Ok((api, providers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_config() {
        let config = ClientConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(connect(&config).is_err());
    }

    #[test]
    fn test_connect_shares_one_client() {
        let (api, providers) = connect(&ClientConfig::default()).unwrap();
        assert!(Arc::strong_count(&api) >= 5);
        drop(providers);
        assert_eq!(Arc::strong_count(&api), 1);
    }
}
