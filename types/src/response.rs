//! Response shape returned to the hosting platform.

use serde::Serialize;

use crate::BundleError;

/// `{"statusCode": ..., "body": "<json>"}`.
///
/// `body` is itself a JSON document encoded as a string, which is what API
/// gateway style integrations expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub const OK: u16 = 200;
    pub const INTERNAL_ERROR: u16 = 500;
    pub const SUCCESS_MESSAGE: &'static str = "Images zipped and uploaded";

    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: Self::OK,
            body: serde_json::json!({ "message": Self::SUCCESS_MESSAGE }).to_string(),
        }
    }

    #[must_use]
    pub fn failure(err: &BundleError) -> Self {
        Self {
            status_code: Self::INTERNAL_ERROR,
            body: serde_json::json!({ "error": err.message }).to_string(),
        }
    }

    /// Collapse a pipeline outcome into the external shape.
    #[must_use]
    pub fn from_outcome<T>(outcome: &Result<T, BundleError>) -> Self {
        match outcome {
            Ok(_) => Self::success(),
            Err(err) => Self::failure(err),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == Self::OK
    }

    /// Decoded `body`, if it is valid JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}
