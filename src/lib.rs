// Public modules
pub mod assistant;
pub mod chat;
pub mod client_logger;
pub mod config;
pub mod error;
pub mod history;
pub mod observability;
pub mod sse;
pub mod transport;
pub mod types;

// Re-exports
pub use assistant::{AssistantClient, FileThreadStore, MemoryThreadStore, RunPoller, ThreadStore};
pub use chat::ChatClient;
pub use client_logger::ClientLogger;
pub use config::{ChatArgs, Config};
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use observability::register_biometrics;
pub use sse::{DecodedStream, StreamDecoder};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::*;
