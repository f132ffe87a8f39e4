//! # Remote Procedures
//!
//! Business operations (deposits, withdrawals, transfers, purchases) run as database
//! functions behind `POST /rest/v1/rpc/{name}`; the client only forwards named
//! arguments and hands back the JSON result.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::client::{error_from_response, transport_error, ApiClient};
use crate::core::error::RemoteError;
use crate::core::service::ProcedureService;

/// Procedure names are plain identifiers.
pub(crate) fn is_valid_procedure_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl ProcedureService for ApiClient {
    #[tracing::instrument(skip(self, args))]
    async fn call(&self, name: &str, args: Value) -> Result<Value, RemoteError> {
        if !is_valid_procedure_name(name) {
            return Err(RemoteError::text(format!("Unknown operation: {}", name)));
        }
        let args = match args {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let start = std::time::Instant::now();
        let response = self
            .authorize(self.client.post(self.url(&format!("/rest/v1/rpc/{}", name))))
            .json(&args)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let err = error_from_response(response).await;
            tracing::warn!(
                status = status.as_u16(),
                error = %err,
                duration_ms = start.elapsed().as_millis() as u64,
                "Procedure failed"
            );
            return Err(err);
        }

        let body = response.text().await.map_err(transport_error)?;
        tracing::debug!(duration_ms = start.elapsed().as_millis() as u64, "Procedure completed");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::text(format!("Failed to parse response: {}", e)))
    }
}
