//! # API Client
//!
//! HTTP client for the backend-as-a-service REST gateway.

use async_channel::Receiver;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use shared::{AuthChange, AuthSession};

use crate::core::config::ClientConfig;
use crate::core::error::{RemoteError, Result};
use crate::core::service::AuthFanout;

/// HTTP client for the REST gateway.
///
/// Holds the current session's tokens; every request is sent with the public API key
/// and, when signed in, the session's bearer token. Session changes made through this
/// client are broadcast on the auth-change channel.
pub struct ApiClient {
    pub(crate) client: Client,
    base_url: String,
    anon_key: Option<String>,
    session: RwLock<Option<AuthSession>>,
    auth_changes: AuthFanout,
}

impl ApiClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            anon_key: config.api_anon_key.clone(),
            session: RwLock::new(None),
            auth_changes: AuthFanout::new(),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the API key and the best available bearer token.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.anon_key {
            Some(key) => request.header("apikey", key),
            None => request,
        };

        let token = self
            .session
            .read()
            .as_ref()
            .map(|session| session.access_token.clone())
            .or_else(|| self.anon_key.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Current session, if signed in.
    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().clone()
    }

    /// Replace the stored session and notify subscribers.
    ///
    /// A session for the same user is reported as a token refresh.
    pub fn set_session(&self, session: Option<AuthSession>) {
        let change = {
            let mut current = self.session.write();
            let change = match (&*current, &session) {
                (_, None) => AuthChange::SignedOut,
                (Some(old), Some(new)) if old.user_id == new.user_id => {
                    AuthChange::TokenRefreshed(new.clone())
                }
                (_, Some(new)) => AuthChange::SignedIn(new.clone()),
            };
            let was_signed_in = current.is_some();
            *current = session;
            if !was_signed_in && matches!(change, AuthChange::SignedOut) {
                return;
            }
            change
        };

        if self.auth_changes.publish(&change) == 0 {
            tracing::debug!("Auth change not delivered, no subscriber");
        }
    }

    /// Drop the stored session without notifying subscribers.
    pub(crate) fn forget_session(&self) {
        *self.session.write() = None;
    }

    pub(crate) fn auth_changes(&self) -> Receiver<AuthChange> {
        self.auth_changes.subscribe()
    }
}

/// Map a transport failure to a remote error.
pub(crate) fn transport_error(err: reqwest::Error) -> RemoteError {
    tracing::error!(error = %err, "Network error");
    if err.is_timeout() {
        RemoteError::text("Network request timed out")
    } else {
        RemoteError::text(format!("Network error: {}", err))
    }
}

/// Decode a failed response into a remote error.
pub(crate) async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    match response.text().await {
        Ok(body) => error_from_body(status, &body),
        Err(err) => transport_error(err),
    }
}

/// Error bodies are JSON objects (`{"message": ..., "code": ...}`), JSON strings, or
/// plain text; an empty body falls back to the HTTP status.
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> RemoteError {
    let body = body.trim();
    if body.is_empty() {
        return RemoteError::structured(
            status.canonical_reason().unwrap_or("Request failed"),
            Some(status.as_u16().to_string()),
        );
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let err = RemoteError::from(value);
            match err {
                RemoteError::Structured { message, code: None } => {
                    RemoteError::structured(message, Some(status.as_u16().to_string()))
                }
                other => other,
            }
        }
        Err(_) => RemoteError::text(body),
    }
}
