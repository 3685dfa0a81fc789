#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use colloquy::{Error, HttpRequest, HttpResponse, Result, Transport};

/// What the scripted transport saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub streaming: bool,
    pub beta_header: Option<String>,
}

enum Reply {
    Text(u16, String),
    Chunks(u16, Vec<Bytes>),
    Fail(Error),
}

/// A transport that answers from a queue and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Reply::Text(status, body.into()));
        self
    }

    pub fn reply_json(&self, body: serde_json::Value) -> &Self {
        self.reply(200, body.to_string())
    }

    pub fn reply_chunks(&self, status: u16, chunks: &[&str]) -> &Self {
        let chunks = chunks
            .iter()
            .map(|chunk| Bytes::from(chunk.to_string()))
            .collect();
        self.push(Reply::Chunks(status, chunks));
        self
    }

    pub fn reply_bytes(&self, status: u16, body: &[u8]) -> &Self {
        self.push(Reply::Chunks(status, vec![Bytes::copy_from_slice(body)]));
        self
    }

    pub fn fail(&self, err: Error) -> &Self {
        self.push(Reply::Fail(err));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method.to_string(),
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            streaming: request.streaming,
            beta_header: request
                .headers
                .get("openai-beta")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(status, body)) => Ok(HttpResponse::from_text(status, body)),
            Some(Reply::Chunks(status, chunks)) => Ok(HttpResponse::from_chunks(status, chunks)),
            Some(Reply::Fail(err)) => Err(err),
            None => Err(Error::network(
                format!("no scripted reply for {} {}", request.method, request.path),
                None,
            )),
        }
    }
}
