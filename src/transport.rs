//! HTTP plumbing shared by both clients.
//!
//! Every outbound call goes through the [`Transport`] trait.  [`ReqwestTransport`] is the
//! production implementation; tests substitute a scripted one.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// A response body delivered incrementally.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A request relative to the provider's base URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, e.g. `threads/abc/runs`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Headers beyond content type and authorization.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// True when the body will be read as an event stream.
    pub streaming: bool,
}

impl HttpRequest {
    /// Create a request with no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            streaming: false,
        }
    }

    /// Create a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request with a JSON body.
    pub fn post<T: Serialize>(path: impl Into<String>, body: &T) -> Result<Self> {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(serde_json::to_value(body)?);
        Ok(request)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Mark the response as an event stream.
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}

/// A response whose body has not been read yet.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// The body, chunk by chunk.
    pub body: BodyStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Create a response from an already-complete body.
    pub fn from_text(status: u16, body: impl Into<String>) -> Self {
        Self::from_chunks(status, vec![Bytes::from(body.into())])
    }

    /// Create a response whose body arrives in the given chunks.
    pub fn from_chunks(status: u16, chunks: Vec<Bytes>) -> Self {
        let body = stream::iter(chunks.into_iter().map(Ok));
        Self {
            status,
            body: Box::pin(body),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body as raw bytes.
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }

    /// Read the whole body as UTF-8 text.
    pub async fn text(self) -> Result<String> {
        String::from_utf8(self.bytes().await?)
            .map_err(|e| Error::decoding(format!("Invalid UTF-8 in body: {e}"), Some(Box::new(e))))
    }

    /// Read the body of a non-2xx response and classify it.
    ///
    /// The body need not be UTF-8; undecodable bytes are replaced before classification.
    pub async fn into_error(self) -> Error {
        let status = self.status;
        match self.bytes().await {
            Ok(body) => Error::from_status(status, &String::from_utf8_lossy(&body)),
            Err(err) => err,
        }
    }
}

/// Executes HTTP requests against the provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response without reading its body.
    ///
    /// Only transport failures are errors here; non-2xx statuses are returned as responses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Execute a request and decode a JSON body.
///
/// Non-2xx statuses are classified with [`Error::from_status`].  For 2xx responses, an empty
/// body is [`Error::NoData`], a body that is not JSON is [`Error::Decoding`], and JSON of the
/// wrong shape is [`Error::InvalidResponse`].
pub(crate) async fn call_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<T> {
    let method = request.method.clone();
    let path = request.path.clone();
    tracing::debug!(%method, path = %path, "sending request");
    let response = transport.execute(request).await?;
    if !response.is_success() {
        return Err(response.into_error().await);
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(Error::NoData);
    }
    let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(%method, path = %path, body = %body, "failed to decode response");
        Error::decoding(format!("Failed to parse response: {e}"), Some(Box::new(e)))
    })?;
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(%method, path = %path, body = %body, "unexpected response shape");
        Error::invalid_response(format!("Unexpected response shape: {e}"))
    })
}

/// [`Transport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
    headers: HeaderMap,
    request_timeout: Duration,
    resource_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport for the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = ReqwestClient::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                Error::configuration(format!("Failed to build HTTP client: {e}"))
            })?;
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::configuration("API key is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        Ok(Self {
            client,
            base_url,
            headers,
            request_timeout: config.request_timeout,
            resource_timeout: config.resource_timeout,
        })
    }

    fn url_for(&self, request: &HttpRequest) -> Result<Url> {
        let mut url = self.base_url.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {e}"), Some(Box::new(e)))
    } else if e.is_connect() {
        Error::network(format!("Connection error: {e}"), Some(Box::new(e)))
    } else {
        Error::network(format!("Request failed: {e}"), Some(Box::new(e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(&request)?;
        let (timeout, accept) = if request.streaming {
            (self.resource_timeout, "text/event-stream")
        } else {
            (self.request_timeout, "application/json")
        };

        let mut headers = self.headers.clone();
        headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        headers.extend(request.headers);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body: BodyStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(map_reqwest_error)),
        );
        let body = if request.streaming {
            with_idle_timeout(body, self.request_timeout)
        } else {
            body
        };
        Ok(HttpResponse { status, body })
    }
}

/// Fail a body stream that goes `idle` without delivering a chunk.
///
/// The total time is still bounded by the per-call timeout; this catches a stream that stalls
/// mid-body long before that.
pub(crate) fn with_idle_timeout(body: BodyStream, idle: Duration) -> BodyStream {
    Box::pin(stream::unfold(Some(body), move |body| async move {
        let mut body = body?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(body))),
            Ok(None) => None,
            Err(_) => Some((
                Err(Error::timeout(
                    format!("stream idle for {}s", idle.as_secs_f64()),
                    None,
                )),
                None,
            )),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_under_base_path() {
        let transport = ReqwestTransport::new(&Config::new("sk-test")).unwrap();
        let request = HttpRequest::get("threads/t1/messages").with_query("limit", "1");
        let url = transport.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openai.com/v1/threads/t1/messages?limit=1"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_ignored() {
        let config = Config::new("sk-test").with_base_url("http://localhost:9000/v1/");
        let transport = ReqwestTransport::new(&config).unwrap();
        let url = transport
            .url_for(&HttpRequest::get("chat/completions"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn bearer_header_is_set() {
        let transport = ReqwestTransport::new(&Config::new("sk-test")).unwrap();
        let auth = transport.headers.get(header::AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer sk-test");
        assert!(auth.is_sensitive());
    }

    #[test]
    fn post_serializes_body() {
        let request = HttpRequest::post("threads", &serde_json::json!({})).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(serde_json::json!({})));
        assert!(!request.streaming);
    }

    #[tokio::test]
    async fn response_text_joins_chunks() {
        let response = HttpResponse::from_chunks(
            200,
            vec![Bytes::from_static(b"hel"), Bytes::from_static(b"lo")],
        );
        assert!(response.is_success());
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoding_error() {
        let response = HttpResponse::from_chunks(200, vec![Bytes::from_static(&[0xff, 0xfe])]);
        assert!(response.text().await.unwrap_err().is_decoding());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out() {
        let first: BodyStream = Box::pin(
            stream::iter(vec![Ok(Bytes::from_static(b"data: {}\n"))])
                .chain(stream::pending::<Result<Bytes>>()),
        );
        let mut body = with_idle_timeout(first, Duration::from_secs(5));
        assert!(body.next().await.unwrap().is_ok());
        let err = body.next().await.unwrap().unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert!(body.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_bound_resets_per_chunk() {
        let slow: BodyStream = Box::pin(stream::iter(0..3).then(|i| async move {
            tokio::time::sleep(Duration::from_secs(4)).await;
            Ok::<_, Error>(Bytes::from(format!("chunk {i}\n")))
        }));
        let chunks: Vec<_> = with_idle_timeout(slow, Duration::from_secs(5)).collect().await;
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.is_ok()));
    }
}
