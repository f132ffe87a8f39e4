use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Whether the provider-issued expiry has already passed at `now`.
    ///
    /// Sessions without an expiry never expire on the client side.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Push notification from the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "session", rename_all = "snake_case")]
pub enum AuthChange {
    /// A user signed in on this device
    SignedIn(AuthSession),
    /// The access token was refreshed for the same user
    TokenRefreshed(AuthSession),
    /// The session ended (revoked, signed out elsewhere, expired)
    SignedOut,
}

impl AuthChange {
    /// The session carried by this change, if any.
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => Some(session),
            AuthChange::SignedOut => None,
        }
    }
}

/// User profile row (full snapshot, never a delta)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display-only balance; the remote service owns all arithmetic on it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Minimal profile carrying only the row id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            email: None,
            balance: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_auth_change_wire_format() {
        let json = r#"{"event":"signed_in","session":{"access_token":"t","user_id":"u1"}}"#;
        let change: AuthChange = serde_json::from_str(json).expect("valid auth change");
        assert_eq!(change.session().map(|s| s.user_id.as_str()), Some("u1"));

        let signed_out: AuthChange =
            serde_json::from_str(r#"{"event":"signed_out"}"#).expect("valid sign out");
        assert_eq!(signed_out, AuthChange::SignedOut);
        assert!(signed_out.session().is_none());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut session = AuthSession {
            access_token: "t".to_string(),
            refresh_token: None,
            user_id: "u1".to_string(),
            email: None,
            expires_at: None,
        };
        assert!(!session.is_expired_at(now));

        session.expires_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 59, 59).unwrap());
        assert!(session.is_expired_at(now));
    }

    #[test]
    fn test_profile_omits_missing_fields() {
        let profile = UserProfile::with_id("u1");
        let json = serde_json::to_string(&profile).expect("serializable");
        assert_eq!(json, r#"{"id":"u1"}"#);
    }
}
