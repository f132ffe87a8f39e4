use serde::{Deserialize, Serialize};

/// Structured failure body returned by the remote service.
///
/// Procedure failures carry a human `message` plus an optional machine `code`
/// (e.g. a SQLSTATE). `details` and `hint` may leak schema names and are never
/// shown to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(alias = "error", alias = "msg", alias = "error_description")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_aliases() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"error":"Invalid login credentials"}"#).expect("alias");
        assert_eq!(body.message, "Invalid login credentials");
        assert!(body.code.is_none());

        let body: ErrorResponse = serde_json::from_str(
            r#"{"message":"duplicate key value","code":"23505","details":"Key (id)=(1)"}"#,
        )
        .expect("full body");
        assert_eq!(body.code.as_deref(), Some("23505"));
    }
}
