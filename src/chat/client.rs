//! Stateless chat-completion client with rolling history.
//!
//! The provider keeps no state between calls, so every request carries the whole
//! conversation.  [`ChatClient`] owns that conversation and commits turns to it as requests
//! complete.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::Mutex;

use crate::client_logger::ClientLogger;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::ConversationHistory;
use crate::observability::{
    CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUESTS, STREAM_EMPTY,
};
use crate::sse;
use crate::transport::{HttpRequest, ReqwestTransport, Transport, call_json};
use crate::types::{ChatCompletion, ChatCompletionRequest, Message};

/// Path of the chat-completion endpoint, relative to the base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// A chat-completion client that maintains multi-turn context.
///
/// Requests on one client are serialized: a second `send_message` waits until the first has
/// committed its turns, so history mutations never interleave.  Wrap the client in an `Arc` to
/// share it between tasks.
///
/// ```no_run
/// # tokio_test::block_on(async {
/// use colloquy::{ChatClient, Config};
///
/// let client = ChatClient::new(Config::from_env()?)?;
/// client.set_system_prompt("Answer in one sentence.").await;
/// let reply = client
///     .send_message_stream("Why is the sky blue?", |text| eprint!("\r{text}"))
///     .await?;
/// println!("\n{reply}");
/// # Ok::<(), colloquy::Error>(())
/// # }).unwrap();
/// ```
pub struct ChatClient {
    config: Config,
    transport: Arc<dyn Transport>,
    history: Mutex<ConversationHistory>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl ChatClient {
    /// Create a client that talks to the provider over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            history: Mutex::new(ConversationHistory::new()),
            logger: None,
        }
    }

    /// Attach a logger that observes completions and stream fragments.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the system prompt, replacing any previous one.
    pub async fn set_system_prompt(&self, prompt: impl Into<String>) {
        self.history.lock().await.set_system_prompt(prompt);
    }

    /// The current system prompt, if any.
    pub async fn system_prompt(&self) -> Option<String> {
        self.history.lock().await.system_prompt().map(String::from)
    }

    /// Forget the whole conversation, system prompt included.
    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// A snapshot of the conversation in order.
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.snapshot()
    }

    /// The most recent user turn, for callers that offer a retry.
    pub async fn last_user_message(&self) -> Option<String> {
        self.history.lock().await.last_user().map(String::from)
    }

    /// Number of messages in the conversation.
    pub async fn message_count(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Send a user message and wait for the complete reply.
    ///
    /// The user turn stays in history even if the call fails; the assistant turn is appended
    /// only on success.
    pub async fn send_message(&self, text: &str) -> Result<String> {
        let mut history = self.history.lock().await;
        history.append_user(text);
        let request = ChatCompletionRequest::new(
            self.config.model.clone(),
            history.snapshot(),
            self.config.temperature,
        );

        let start = Instant::now();
        CHAT_REQUESTS.click();
        let result = self.complete(request).await;
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                history.append_assistant(reply.clone());
                Ok(reply)
            }
            Err(err) => {
                CHAT_REQUEST_ERRORS.click();
                tracing::debug!("chat request failed: {err}");
                Err(err)
            }
        }
    }

    /// Send a user message and stream the reply.
    ///
    /// `on_fragment` receives the accumulated text after every fragment, so each call sees a
    /// strictly longer prefix than the last.  The method returns only after the final
    /// fragment has been delivered; a stream that produced no text is [`Error::NoData`].
    pub async fn send_message_stream<F>(&self, text: &str, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let mut history = self.history.lock().await;
        history.append_user(text);
        let request = ChatCompletionRequest::new(
            self.config.model.clone(),
            history.snapshot(),
            self.config.temperature,
        )
        .streaming();

        let start = Instant::now();
        CHAT_REQUESTS.click();
        let result = self.stream(request, &mut on_fragment).await;
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                history.append_assistant(reply.clone());
                Ok(reply)
            }
            Err(err) => {
                CHAT_REQUEST_ERRORS.click();
                tracing::debug!("streaming chat request failed: {err}");
                Err(err)
            }
        }
    }

    async fn complete(&self, request: ChatCompletionRequest) -> Result<String> {
        let http = HttpRequest::post(CHAT_COMPLETIONS_PATH, &request)?;
        let completion: ChatCompletion = call_json(self.transport.as_ref(), http).await?;
        if let Some(logger) = &self.logger {
            logger.log_completion(&completion);
        }
        completion
            .assistant_text()
            .map(String::from)
            .ok_or_else(|| Error::invalid_response("response contained no assistant message"))
    }

    async fn stream(
        &self,
        request: ChatCompletionRequest,
        on_fragment: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String> {
        let http = HttpRequest::post(CHAT_COMPLETIONS_PATH, &request)?.streaming();
        tracing::debug!(model = %request.model, "sending streaming request");
        let response = self.transport.execute(http).await?;
        if !response.is_success() {
            return Err(response.into_error().await);
        }

        let mut fragments = std::pin::pin!(sse::fragments(response.body));
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            if fragment.done {
                if let Some(logger) = &self.logger {
                    logger.log_stream_complete(&fragment.accumulated);
                }
                return Ok(fragment.accumulated);
            }
            if let Some(logger) = &self.logger {
                logger.log_fragment(&fragment);
            }
            on_fragment(&fragment.accumulated);
        }
        STREAM_EMPTY.click();
        Err(Error::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        ChatClient::new(Config::new("sk-test")).unwrap()
    }

    #[tokio::test]
    async fn new_client_empty() {
        let client = client();
        assert_eq!(client.message_count().await, 0);
        assert!(client.system_prompt().await.is_none());
        assert_eq!(client.config().model, "gpt-4");
    }

    #[tokio::test]
    async fn set_system_prompt() {
        let client = client();
        client.set_system_prompt("Be helpful").await;
        assert_eq!(client.system_prompt().await.as_deref(), Some("Be helpful"));
        client.set_system_prompt("Be brief").await;
        assert_eq!(client.system_prompt().await.as_deref(), Some("Be brief"));
        assert_eq!(client.message_count().await, 1);
    }

    #[tokio::test]
    async fn clear_history() {
        let client = client();
        client.set_system_prompt("sys").await;
        client.clear_history().await;
        assert_eq!(client.message_count().await, 0);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(ChatClient::new(Config::new("")).is_err());
    }
}
