//! API request and response types

use authlatch_core::{LatchError, Result};
use serde::{Deserialize, Serialize};

/// Message returned by both routes on success
pub const AUTHORIZED_MESSAGE: &str = "Authorized";

/// Claim request body
///
/// `name` is kept as a raw JSON value so a non-string name is reported as a
/// missing name rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClaimRequest {
    /// Claimant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<serde_json::Value>,
}

impl ClaimRequest {
    /// Request claiming authorization for `name`
    pub fn new(name: impl Into<String>) -> Self {
        ClaimRequest {
            name: Some(serde_json::Value::String(name.into())),
        }
    }

    /// The claimant name, when present and a string
    pub fn name(&self) -> Result<&str> {
        match &self.name {
            Some(serde_json::Value::String(name)) => Ok(name.as_str()),
            _ => Err(LatchError::InvalidArgument("name is required".to_string())),
        }
    }
}

/// Success acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human readable outcome
    pub message: String,
}

impl MessageResponse {
    /// The `{"message":"Authorized"}` body
    pub fn authorized() -> Self {
        MessageResponse {
            message: AUTHORIZED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claim_request_name() {
        let req: ClaimRequest = serde_json::from_value(json!({"name": "alice"})).unwrap();
        assert_eq!(req.name().unwrap(), "alice");

        // Empty names pass through; the holder rejects them
        let req: ClaimRequest = serde_json::from_value(json!({"name": ""})).unwrap();
        assert_eq!(req.name().unwrap(), "");
    }

    #[test]
    fn test_claim_request_missing_or_non_string_name() {
        for body in [
            json!({}),
            json!({"name": null}),
            json!({"name": 42}),
            json!({"name": ["alice"]}),
            json!({"name": {"first": "alice"}}),
            json!({"other": "alice"}),
        ] {
            let req: ClaimRequest = serde_json::from_value(body.clone()).unwrap();
            assert!(
                matches!(req.name(), Err(LatchError::InvalidArgument(_))),
                "body {} should be rejected",
                body
            );
        }
    }

    #[test]
    fn test_claim_request_serialization() {
        let json = serde_json::to_value(ClaimRequest::new("bob")).unwrap();
        assert_eq!(json, json!({"name": "bob"}));

        let json = serde_json::to_value(ClaimRequest::default()).unwrap();
        assert_eq!(json, json!({}));
    }

    #[test]
    fn test_message_response_body() {
        let json = serde_json::to_string(&MessageResponse::authorized()).unwrap();
        assert_eq!(json, r#"{"message":"Authorized"}"#);
    }
}
