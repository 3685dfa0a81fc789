use serde::{Deserialize, Serialize};

/// A provider-side conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Opaque thread identifier.
    #[serde(default)]
    pub id: Option<String>,
}

/// A handle to a thread this client has created or confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle {
    /// Opaque thread identifier.
    pub thread_id: String,
}

impl ThreadHandle {
    /// Create a new handle for the given thread.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}
