// Public modules
pub mod api_error;
pub mod chat_completion;
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod message;
pub mod role;
pub mod run;
pub mod run_status;
pub mod stream_fragment;
pub mod thread;
pub mod thread_message;

// Re-exports
pub use api_error::ApiErrorObject;
pub use chat_completion::{ChatCompletion, Choice, ChoiceMessage};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, Delta};
pub use chat_completion_request::ChatCompletionRequest;
pub use message::Message;
pub use role::Role;
pub use run::{CreateRunRequest, Run};
pub use run_status::RunStatus;
pub use stream_fragment::StreamFragment;
pub use thread::{Thread, ThreadHandle};
pub use thread_message::{
    CreateMessageRequest, MessageContent, MessageList, TextContent, ThreadMessage,
};
