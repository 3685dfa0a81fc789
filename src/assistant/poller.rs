//! Drives an assistant run from creation to a terminal state.
//!
//! The provider offers no push notification for run completion, so the poller checks the run
//! status on a fixed cadence.  Each session is an explicit state machine:
//!
//! ```text
//! Waiting --interval--> Checking --queued/in_progress/other--> Waiting
//!                          |--completed--> Fetching --> Done(text | "no assistant response")
//!                          |--failed/cancelled--> Done("run failed")
//!                          `--transport/decoding error--> Done(error)
//! ```
//!
//! Cancellation is checked while waiting, before each check, and around every request, so a
//! torn-down client never observes a late result.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{RUN_FAILURES, RUN_POLLS};
use crate::transport::{HttpRequest, Transport, call_json};
use crate::types::{MessageList, Run, RunStatus};

use super::assistants_request;

/// Message of the error delivered when a run fails or is cancelled.
pub const RUN_FAILED: &str = "run failed";
/// Message of the error delivered when a completed run left no assistant text.
pub const NO_ASSISTANT_RESPONSE: &str = "no assistant response";
/// Message of the error delivered when the optional polling bound elapses.
pub const RUN_TIMED_OUT: &str = "run timed out";

#[derive(Debug)]
enum PollState {
    Waiting,
    Checking,
    Fetching,
    Done(Result<String>),
}

/// Polls one run at a time until it reaches a terminal state.
#[derive(Clone)]
pub struct RunPoller {
    transport: Arc<dyn Transport>,
    interval: Duration,
    max_duration: Option<Duration>,
    cancel: CancellationToken,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl RunPoller {
    /// Create a poller that checks status every `interval`.
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            transport,
            interval,
            max_duration: None,
            cancel: CancellationToken::new(),
            logger: None,
        }
    }

    /// Give up with [`RUN_TIMED_OUT`] once a run has been polled this long.
    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Stop polling when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report each observed status to `logger`.
    pub fn with_logger(mut self, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// The delay between status checks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `run_id` on `thread_id` until it finishes, then fetch the reply.
    ///
    /// Returns the concatenated assistant text of the newest thread message.  A failed or
    /// cancelled run is [`Error::Run`]; any request error stops polling and is returned as is.
    /// Non-terminal statuses, including ones this crate does not know, keep the loop going.
    pub async fn poll_until_terminal(&self, thread_id: &str, run_id: &str) -> Result<String> {
        let started = Instant::now();
        let mut state = PollState::Waiting;
        loop {
            state = match state {
                PollState::Waiting => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => PollState::Done(Err(aborted())),
                        _ = tokio::time::sleep(self.interval) => PollState::Checking,
                    }
                }
                PollState::Checking => {
                    if self.cancel.is_cancelled() {
                        PollState::Done(Err(aborted()))
                    } else if let Some(max) = self.max_duration
                        && started.elapsed() >= max
                    {
                        PollState::Done(Err(Error::run(RUN_TIMED_OUT)))
                    } else {
                        match self.check(thread_id, run_id).await {
                            Ok(RunStatus::Completed) => PollState::Fetching,
                            Ok(RunStatus::Failed | RunStatus::Cancelled) => {
                                PollState::Done(Err(Error::run(RUN_FAILED)))
                            }
                            Ok(_) => PollState::Waiting,
                            Err(err) => PollState::Done(Err(err)),
                        }
                    }
                }
                PollState::Fetching => PollState::Done(self.fetch_reply(thread_id).await),
                PollState::Done(result) => {
                    if result.as_ref().is_err_and(Error::is_run) {
                        RUN_FAILURES.click();
                    }
                    return result;
                }
            };
        }
    }

    async fn check(&self, thread_id: &str, run_id: &str) -> Result<RunStatus> {
        RUN_POLLS.click();
        let request = assistants_request(HttpRequest::get(format!(
            "threads/{thread_id}/runs/{run_id}"
        )));
        let run: Run = self.cancellable(call_json(self.transport.as_ref(), request)).await?;
        tracing::debug!(thread_id, run_id, status = %run.status, "run status");
        if let Some(logger) = &self.logger {
            logger.log_run_status(thread_id, run_id, &run.status);
        }
        Ok(run.status)
    }

    async fn fetch_reply(&self, thread_id: &str) -> Result<String> {
        let request = assistants_request(
            HttpRequest::get(format!("threads/{thread_id}/messages")).with_query("limit", "1"),
        );
        let messages: MessageList = self
            .cancellable(call_json(self.transport.as_ref(), request))
            .await?;
        let text = messages.latest_assistant_text();
        if text.is_empty() {
            Err(Error::run(NO_ASSISTANT_RESPONSE))
        } else {
            Ok(text)
        }
    }

    async fn cancellable<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(aborted()),
            result = call => result,
        }
    }
}

impl std::fmt::Debug for RunPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunPoller")
            .field("interval", &self.interval)
            .field("max_duration", &self.max_duration)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn aborted() -> Error {
    Error::aborted("client shut down while polling")
}
