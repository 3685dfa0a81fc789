mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use colloquy::assistant::{NO_ASSISTANT_RESPONSE, RUN_FAILED, RUN_TIMED_OUT};
use colloquy::{Error, RunPoller};

use common::ScriptedTransport;

fn run(status: &str) -> serde_json::Value {
    json!({"id": "run_1", "object": "thread.run", "status": status})
}

fn poller(transport: &ScriptedTransport) -> RunPoller {
    RunPoller::new(Arc::new(transport.clone()), Duration::from_secs(1))
}

fn status_checks(transport: &ScriptedTransport) -> usize {
    transport
        .paths()
        .iter()
        .filter(|p| p.as_str() == "GET threads/thread_1/runs/run_1")
        .count()
}

#[tokio::test(start_paused = true)]
async fn completed_run_returns_concatenated_text() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(run("queued"))
        .reply_json(run("in_progress"))
        .reply_json(run("completed"))
        .reply_json(json!({
            "object": "list",
            "data": [{
                "role": "assistant",
                "content": [
                    {"type": "text", "text": {"value": "foo", "annotations": []}},
                    {"type": "image_file", "image_file": {"file_id": "file_1"}},
                    {"type": "text", "text": {"value": "bar", "annotations": []}}
                ]
            }]
        }));

    let start = tokio::time::Instant::now();
    let text = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap();
    assert_eq!(text, "foobar");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));

    let requests = transport.requests();
    assert_eq!(status_checks(&transport), 3);
    let fetch = requests.last().unwrap();
    assert_eq!(fetch.path, "threads/thread_1/messages");
    assert_eq!(fetch.query, vec![("limit".to_string(), "1".to_string())]);
    assert_eq!(fetch.beta_header.as_deref(), Some("assistants=v2"));
}

#[tokio::test(start_paused = true)]
async fn failed_run_stops_polling() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(run("in_progress"))
        .reply_json(run("failed"))
        .reply_json(run("in_progress"));

    let err = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(err.is_run());
    assert_eq!(err.message(), Some(RUN_FAILED));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(status_checks(&transport), 2);
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_is_a_failure() {
    let transport = ScriptedTransport::new();
    transport.reply_json(run("cancelled"));

    let err = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert_eq!(err.message(), Some(RUN_FAILED));
}

#[tokio::test(start_paused = true)]
async fn unknown_status_keeps_polling() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(run("requires_action"))
        .reply_json(run("cancelling"))
        .reply_json(run("completed"))
        .reply_json(json!({"data": [{"role": "assistant", "content": [
            {"type": "text", "text": {"value": "done"}}
        ]}]}));

    let text = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap();
    assert_eq!(text, "done");
    assert_eq!(status_checks(&transport), 3);
}

#[tokio::test(start_paused = true)]
async fn transport_error_stops_polling() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(run("in_progress"))
        .fail(Error::network("connection reset", None))
        .reply_json(run("completed"));

    let err = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_without_assistant_text() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(run("completed"))
        .reply_json(json!({"data": [{"role": "user", "content": [
            {"type": "text", "text": {"value": "hello"}}
        ]}]}));

    let err = poller(&transport)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(err.is_run());
    assert_eq!(err.message(), Some(NO_ASSISTANT_RESPONSE));
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_first_check() {
    let transport = ScriptedTransport::new();
    let token = CancellationToken::new();
    token.cancel();

    let err = poller(&transport)
        .with_cancellation(token)
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(err.is_aborted());
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_while_waiting() {
    let transport = ScriptedTransport::new();
    for _ in 0..5 {
        transport.reply_json(run("in_progress"));
    }
    let token = CancellationToken::new();
    let poller = poller(&transport).with_cancellation(token.clone());
    let task = tokio::spawn(async move { poller.poll_until_terminal("thread_1", "run_1").await });

    tokio::time::sleep(Duration::from_millis(2500)).await;
    token.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(status_checks(&transport), 2);
}

#[tokio::test(start_paused = true)]
async fn max_duration_bounds_polling() {
    let transport = ScriptedTransport::new();
    for _ in 0..5 {
        transport.reply_json(run("in_progress"));
    }

    let err = poller(&transport)
        .with_max_duration(Some(Duration::from_millis(2500)))
        .poll_until_terminal("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(err.is_run());
    assert_eq!(err.message(), Some(RUN_TIMED_OUT));
    assert_eq!(status_checks(&transport), 2);
}
