use serde::{Deserialize, Serialize};

use crate::types::RunStatus;

/// Body of a run-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRunRequest {
    /// The assistant that executes the run.
    pub assistant_id: String,

    /// Whether the provider should stream run events back.
    pub stream: bool,
}

impl CreateRunRequest {
    /// Create a non-streaming run request for the given assistant.
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            stream: false,
        }
    }
}

/// A provider-side run, as returned by creation and status checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Opaque run identifier; status checks may omit it.
    #[serde(default)]
    pub id: Option<String>,

    /// Current lifecycle state.
    pub status: RunStatus,
}
