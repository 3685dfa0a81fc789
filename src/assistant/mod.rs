//! Stateful assistant/thread client.
//!
//! - [`client`]: thread resolution and the send-message sequence
//! - [`poller`]: the run status state machine
//! - [`store`]: persistence of the thread identifier

mod client;
mod poller;
mod store;

pub use client::AssistantClient;
pub use poller::{NO_ASSISTANT_RESPONSE, RUN_FAILED, RUN_TIMED_OUT, RunPoller};
pub use store::{FileThreadStore, MemoryThreadStore, ThreadStore};

use crate::transport::HttpRequest;

/// Tag a request for the v2 assistants API.
pub(crate) fn assistants_request(request: HttpRequest) -> HttpRequest {
    request.with_header("openai-beta", "assistants=v2")
}
