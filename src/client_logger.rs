//! Logging trait for client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log the interactions passing through a [`ChatClient`](crate::ChatClient) or an
//! [`AssistantClient`](crate::AssistantClient).

use crate::types::{ChatCompletion, RunStatus, StreamFragment};

/// A trait for logging client operations.
///
/// Implement this trait to capture non-streaming completions, individual streaming
/// fragments, and assistant run status transitions.
///
/// # Example
///
/// ```rust,ignore
/// use colloquy::{ChatCompletion, ClientLogger, RunStatus, StreamFragment};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_completion(&self, completion: &ChatCompletion) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Completion: {}", serde_json::to_string(completion).unwrap()).unwrap();
///     }
///
///     fn log_fragment(&self, fragment: &StreamFragment) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Fragment: {:?}", fragment.delta).unwrap();
///     }
///
///     fn log_stream_complete(&self, text: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream complete: {text}").unwrap();
///     }
///
///     fn log_run_status(&self, thread_id: &str, run_id: &str, status: &RunStatus) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Run {thread_id}/{run_id}: {status}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a complete response from a non-streaming `send_message` call.
    fn log_completion(&self, completion: &ChatCompletion);

    /// Log an individual streaming fragment.
    ///
    /// Called for each content fragment, in the order it is delivered to the caller.
    fn log_fragment(&self, fragment: &StreamFragment);

    /// Log the full text of a completed stream.
    ///
    /// Called once, after the last fragment, only when the stream produced text.
    fn log_stream_complete(&self, text: &str);

    /// Log a run status observed while polling.
    fn log_run_status(&self, thread_id: &str, run_id: &str, status: &RunStatus);
}
