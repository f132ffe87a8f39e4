//! # Authentication Endpoints
//!
//! Session lookup, password sign-in, token refresh and sign-out against the identity
//! service (`/auth/v1`).

use async_channel::Receiver;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use shared::{AuthChange, AuthSession};

use super::client::{error_from_response, transport_error, ApiClient};
use crate::core::error::{AppError, RemoteError, Result};
use crate::core::service::{CredentialStore, IdentityProvider};

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Authenticated user as returned by the identity service
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: token.user.id,
            email: token.user.email,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }
}

impl ApiClient {
    /// Sign in with email and password.
    #[tracing::instrument(skip(self, email, password), fields(email = %shared::mask_identifier(email, 3, 0)))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<AuthSession, RemoteError> {
        tracing::info!("Attempting sign-in");
        let start = std::time::Instant::now();

        let response = self
            .authorize(self.client.post(self.url("/auth/v1/token?grant_type=password")))
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(transport_error)?;

        let session = self.read_token(response).await?;
        tracing::info!(duration_ms = start.elapsed().as_millis() as u64, "Sign-in successful");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Exchange the stored refresh token for a new session.
    pub async fn refresh_session(&self) -> Result<AuthSession> {
        let refresh_token = self
            .session()
            .and_then(|session| session.refresh_token)
            .ok_or_else(|| AppError::Session("No refresh token available".to_string()))?;

        let response = self
            .authorize(self.client.post(self.url("/auth/v1/token?grant_type=refresh_token")))
            .json(&RefreshGrant {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let session = self.read_token(response).await?;
        tracing::debug!("Session refreshed");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn read_token(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<AuthSession, RemoteError> {
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::warn!(error = %err, "Token request rejected");
            return Err(err);
        }

        let token = response.json::<TokenResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "Token response parse error");
            RemoteError::text(format!("Failed to parse response: {}", e))
        })?;
        Ok(token.into())
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    /// Validate the stored session against the identity service.
    ///
    /// A rejected token means the persisted session is gone: it is dropped and `None`
    /// is returned.
    async fn current_session(&self) -> std::result::Result<Option<AuthSession>, RemoteError> {
        let Some(mut session) = self.session() else {
            return Ok(None);
        };
        if session.is_expired_at(Utc::now()) && session.refresh_token.is_some() {
            match self.refresh_session().await {
                Ok(refreshed) => session = refreshed,
                Err(err) => tracing::warn!(error = %err, "Stored session could not be refreshed"),
            }
        }

        let response = self
            .authorize(self.client.get(self.url("/auth/v1/user")))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let user = response.json::<AuthUser>().await.map_err(|e| {
                    RemoteError::text(format!("Failed to parse response: {}", e))
                })?;
                session.user_id = user.id;
                if user.email.is_some() {
                    session.email = user.email;
                }
                Ok(Some(session))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::info!("Stored session rejected by identity service");
                self.forget_session();
                Ok(None)
            }
            _ => Err(error_from_response(response).await),
        }
    }

    async fn sign_out(&self) -> std::result::Result<(), RemoteError> {
        if self.session().is_none() {
            return Ok(());
        }

        let response = self
            .authorize(self.client.post(self.url("/auth/v1/logout")))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            tracing::info!("Signed out at identity service");
            self.set_session(None);
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    fn subscribe(&self) -> Receiver<AuthChange> {
        self.auth_changes()
    }
}

impl CredentialStore for ApiClient {
    fn clear(&self) {
        self.forget_session();
    }
}
