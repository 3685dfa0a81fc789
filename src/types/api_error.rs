use serde::{Deserialize, Serialize};

/// A structured error payload embedded in a provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorObject {
    /// Human-readable error message.
    pub message: String,

    /// Machine-readable error category.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ApiErrorObject {
    /// Convert this payload into an [`crate::Error::Api`] with the given status.
    pub fn into_error(self, status_code: u16) -> crate::Error {
        crate::Error::api(status_code, self.error_type, self.message)
    }
}
