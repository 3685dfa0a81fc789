//! Stateful assistant/thread client.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client_logger::ClientLogger;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::observability::{
    RUN_DURATION, RUNS_STARTED, THREADS_CREATED, THREADS_DISCARDED, THREADS_REUSED,
};
use crate::transport::{HttpRequest, ReqwestTransport, Transport, call_json};
use crate::types::{CreateMessageRequest, CreateRunRequest, Run, Thread, ThreadHandle};

use super::assistants_request;
use super::poller::RunPoller;
use super::store::{MemoryThreadStore, ThreadStore};

/// A client that converses through a durable provider-side thread.
///
/// The provider keeps the conversation; this client only remembers which thread it belongs
/// to.  Each [`send_message`](Self::send_message) ensures the thread exists, posts the user
/// turn, starts a run, and polls the run to completion.
///
/// Calls on one client are serialized.  Dropping the client, or calling
/// [`shutdown`](Self::shutdown), cancels any in-flight polling and no callback fires after
/// that.
pub struct AssistantClient {
    config: Config,
    assistant_id: String,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ThreadStore>,
    thread: Mutex<Option<ThreadHandle>>,
    cancel: CancellationToken,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl AssistantClient {
    /// Create a client that talks to the provider over HTTP and remembers its thread in memory.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryThreadStore::new()))
    }

    /// Create a client that talks to the provider over HTTP with the given thread store.
    pub fn with_store(config: Config, store: Arc<dyn ThreadStore>) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport), store)
    }

    /// Create a client over a custom transport.
    ///
    /// The store is read once here; a previously persisted thread is verified on first use.
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ThreadStore>,
    ) -> Result<Self> {
        let assistant_id = config.require_assistant_id()?.to_string();
        let thread = store.load().map(ThreadHandle::new);
        Ok(Self {
            config,
            assistant_id,
            transport,
            store,
            thread: Mutex::new(thread),
            cancel: CancellationToken::new(),
            logger: None,
        })
    }

    /// Attach a logger that observes run status transitions.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The thread this client currently believes in, confirmed or not.
    pub async fn thread_id(&self) -> Option<String> {
        self.thread
            .lock()
            .await
            .as_ref()
            .map(|handle| handle.thread_id.clone())
    }

    /// Forget the current thread so the next message starts a new one.
    pub async fn reset_thread(&self) {
        let mut thread = self.thread.lock().await;
        *thread = None;
        self.store.clear();
    }

    /// Cancel in-flight polling and refuse further calls.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Return a usable thread id, verifying or creating it as needed.
    ///
    /// A known id is confirmed with a retrieval call; if that fails it is discarded and a new
    /// thread is created.  Every confirmed or created id is written to the store.
    pub async fn ensure_thread(&self) -> Result<String> {
        let mut thread = self.thread.lock().await;
        self.ensure_thread_locked(&mut thread).await
    }

    /// Send a user message and deliver the assistant's reply to `on_final`.
    ///
    /// `on_final` runs at most once, and only on success while the client is still live.
    pub async fn send_message<F>(&self, text: &str, on_final: F) -> Result<()>
    where
        F: FnOnce(String) + Send,
    {
        let mut thread = self.thread.lock().await;
        let thread_id = self.ensure_thread_locked(&mut thread).await?;
        self.post_message(&thread_id, text).await?;
        let run_id = self.start_run(&thread_id).await?;

        let start = Instant::now();
        let reply = self.poller().poll_until_terminal(&thread_id, &run_id).await;
        RUN_DURATION.add(start.elapsed().as_secs_f64());
        let reply = reply?;

        self.check_live()?;
        on_final(reply);
        Ok(())
    }

    fn poller(&self) -> RunPoller {
        RunPoller::new(self.transport.clone(), self.config.poll_interval)
            .with_max_duration(self.config.max_poll_duration)
            .with_cancellation(self.cancel.child_token())
            .with_logger(self.logger.clone())
    }

    async fn ensure_thread_locked(&self, slot: &mut Option<ThreadHandle>) -> Result<String> {
        self.check_live()?;
        if let Some(handle) = slot.take() {
            match self.retrieve_thread(&handle.thread_id).await {
                Ok(()) => {
                    THREADS_REUSED.click();
                    self.store.save(&handle.thread_id);
                    let thread_id = handle.thread_id.clone();
                    *slot = Some(handle);
                    return Ok(thread_id);
                }
                Err(err) if err.is_aborted() => {
                    *slot = Some(handle);
                    return Err(err);
                }
                Err(err) => {
                    THREADS_DISCARDED.click();
                    tracing::info!(thread_id = %handle.thread_id, "discarding thread: {err}");
                    self.store.clear();
                }
            }
        }

        let thread_id = self.create_thread().await?;
        THREADS_CREATED.click();
        self.store.save(&thread_id);
        *slot = Some(ThreadHandle::new(thread_id.clone()));
        Ok(thread_id)
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<()> {
        let request = assistants_request(HttpRequest::get(format!("threads/{thread_id}")));
        let _: Thread = self.cancellable(self.call(request)).await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        let request = assistants_request(HttpRequest::post("threads", &serde_json::json!({}))?);
        let thread: Thread = self
            .cancellable(self.call(request))
            .await
            .map_err(|err| match err {
                Error::Network { .. } | Error::Aborted { .. } => err,
                err => Error::thread(format!("could not create thread: {err}")),
            })?;
        let thread_id = thread
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::thread("thread creation returned no id"))?;
        tracing::debug!(thread_id = %thread_id, "created thread");
        Ok(thread_id)
    }

    async fn post_message(&self, thread_id: &str, text: &str) -> Result<()> {
        let request = assistants_request(HttpRequest::post(
            format!("threads/{thread_id}/messages"),
            &CreateMessageRequest::user(text),
        )?);
        let _: serde_json::Value = self.cancellable(self.call(request)).await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<String> {
        let request = assistants_request(HttpRequest::post(
            format!("threads/{thread_id}/runs"),
            &CreateRunRequest::new(self.assistant_id.clone()),
        )?);
        let run: Run = self.cancellable(self.call(request)).await?;
        let run_id = run
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::run("run creation returned no id"))?;
        RUNS_STARTED.click();
        tracing::debug!(thread_id, run_id = %run_id, status = %run.status, "started run");
        Ok(run_id)
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        call_json(self.transport.as_ref(), request).await
    }

    async fn cancellable<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::aborted("client shut down")),
            result = call => result,
        }
    }

    fn check_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::aborted("client shut down"))
        } else {
            Ok(())
        }
    }
}

impl Drop for AssistantClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_assistant_id() {
        let err = AssistantClient::new(Config::new("sk-test")).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn reads_store_at_construction() {
        let store = Arc::new(MemoryThreadStore::with_thread_id("thread_saved"));
        let config = Config::new("sk-test").with_assistant_id("asst_1");
        let client = AssistantClient::with_store(config, store).unwrap();
        assert_eq!(client.thread_id().await.as_deref(), Some("thread_saved"));
    }

    #[tokio::test]
    async fn reset_clears_store() {
        let store = Arc::new(MemoryThreadStore::with_thread_id("thread_saved"));
        let config = Config::new("sk-test").with_assistant_id("asst_1");
        let client = AssistantClient::with_store(config, store.clone()).unwrap();
        client.reset_thread().await;
        assert!(client.thread_id().await.is_none());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn shut_down_client_refuses_calls() {
        let config = Config::new("sk-test").with_assistant_id("asst_1");
        let client = AssistantClient::new(config).unwrap();
        client.shutdown();
        assert!(client.is_shut_down());
        assert!(client.ensure_thread().await.unwrap_err().is_aborted());
    }
}
