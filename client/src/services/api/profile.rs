//! # Profile Endpoint
//!
//! Reads the caller's row from the `profiles` table through the REST gateway.

use async_trait::async_trait;
use shared::UserProfile;

use super::client::{error_from_response, transport_error, ApiClient};
use crate::core::error::RemoteError;
use crate::core::service::ProfileService;

/// Ask the gateway for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub(crate) fn profile_path(user_id: &str) -> String {
    format!("/rest/v1/profiles?id=eq.{}&select=*", user_id)
}

#[async_trait]
impl ProfileService for ApiClient {
    #[tracing::instrument(skip(self), fields(user = %shared::mask_id(user_id)))]
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError> {
        let response = self
            .authorize(self.client.get(self.url(&profile_path(user_id))))
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let profile = response.json::<UserProfile>().await.map_err(|e| {
            tracing::error!(error = %e, "Profile parse error");
            RemoteError::text(format!("Failed to parse response: {}", e))
        })?;
        tracing::debug!("Profile loaded");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path_filters_by_id() {
        assert_eq!(
            profile_path("4f1c2a9e"),
            "/rest/v1/profiles?id=eq.4f1c2a9e&select=*"
        );
    }
}
