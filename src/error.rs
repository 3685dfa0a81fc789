//! Error types for the Colloquy client.
//!
//! Both the chat client and the assistant client report failures through the
//! same [`Error`] taxonomy.  Nothing is retried internally; every I/O or parse
//! failure is surfaced to the caller, who decides what the user sees.

use std::error;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// The main error type for the Colloquy client.
#[derive(Clone, Debug)]
pub enum Error {
    /// Transport-level failure: connection refused, TLS, timeouts, broken bodies.
    Network {
        /// Human-readable error message.
        message: String,
        /// True when the call exceeded its request or resource timeout.
        timed_out: bool,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The provider answered with a shape we cannot use.
    ///
    /// Covers non-2xx responses without a parseable error body and 2xx bodies that parse but
    /// lack the expected content.
    InvalidResponse {
        /// Human-readable error message.
        message: String,
    },

    /// The body was absent, or a stream produced zero fragments.
    NoData,

    /// JSON parse failure on an otherwise well-formed 2xx body.
    Decoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The provider returned a structured error payload.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error type string from the provider, if any.
        error_type: Option<String>,
        /// Provider-supplied message.
        message: String,
    },

    /// Thread creation or verification failed.
    Thread {
        /// Human-readable error message.
        message: String,
    },

    /// A run failed, was cancelled, or completed without an assistant reply.
    Run {
        /// Human-readable error message.
        message: String,
    },

    /// The client was configured incorrectly.
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// The client was torn down while the call was in flight.
    Aborted {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new network error.
    pub fn network(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Network {
            message: message.into(),
            timed_out: false,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new network error for a call that exceeded its timeout.
    pub fn timeout(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Network {
            message: message.into(),
            timed_out: true,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Error::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a new decoding error.
    pub fn decoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Decoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new API error.
    pub fn api(status_code: u16, error_type: Option<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// Creates a new thread error.
    pub fn thread(message: impl Into<String>) -> Self {
        Error::Thread {
            message: message.into(),
        }
    }

    /// Creates a new run error.
    pub fn run(message: impl Into<String>) -> Self {
        Error::Run {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new aborted error.
    pub fn aborted(message: impl Into<String>) -> Self {
        Error::Aborted {
            message: message.into(),
        }
    }

    /// Classify a non-2xx response.
    ///
    /// A body of the form `{"error": {"message": ..., "type": ...}}` becomes [`Error::Api`].
    /// Anything else becomes [`Error::InvalidResponse`]; the raw body goes to the log only.
    pub fn from_status(status_code: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|response| response.error);
        match detail {
            Some(ErrorDetail {
                error_type,
                message: Some(message),
            }) => Error::api(status_code, error_type, message),
            _ => {
                tracing::warn!(status_code, body, "non-2xx response without error payload");
                Error::invalid_response(format!("unexpected status {status_code}"))
            }
        }
    }

    /// Returns true if this error is a transport failure.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Returns true if this error is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Network {
                timed_out: true,
                ..
            }
        )
    }

    /// Returns true if the response had an unexpected shape.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Error::InvalidResponse { .. })
    }

    /// Returns true if the response carried no data.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NoData)
    }

    /// Returns true if a 2xx body failed to parse.
    pub fn is_decoding(&self) -> bool {
        matches!(self, Error::Decoding { .. })
    }

    /// Returns true if the provider returned a structured error.
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api { .. })
    }

    /// Returns true if this is a thread lifecycle error.
    pub fn is_thread(&self) -> bool {
        matches!(self, Error::Thread { .. })
    }

    /// Returns true if this is a run lifecycle error.
    pub fn is_run(&self) -> bool {
        matches!(self, Error::Run { .. })
    }

    /// Returns true if the client was torn down mid-call.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted { .. })
    }

    /// Returns true if the client was misconfigured.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Returns the provider message for API, thread, and run errors.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Api { message, .. } | Error::Thread { message } | Error::Run { message } => {
                Some(message)
            }
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network {
                message, timed_out, ..
            } => {
                if *timed_out {
                    write!(f, "Network error (timed out): {message}")
                } else {
                    write!(f, "Network error: {message}")
                }
            }
            Error::InvalidResponse { message } => {
                write!(f, "Invalid response: {message}")
            }
            Error::NoData => {
                write!(f, "No data in response")
            }
            Error::Decoding { message, .. } => {
                write!(f, "Decoding error: {message}")
            }
            Error::Api {
                error_type,
                message,
                ..
            } => {
                if let Some(error_type) = error_type {
                    write!(f, "{error_type}: {message}")
                } else {
                    write!(f, "API error: {message}")
                }
            }
            Error::Thread { message } => {
                write!(f, "Thread error: {message}")
            }
            Error::Run { message } => {
                write!(f, "Run error: {message}")
            }
            Error::Configuration { message } => {
                write!(f, "Configuration error: {message}")
            }
            Error::Aborted { message } => {
                write!(f, "Aborted: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Network { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Decoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decoding(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::configuration(format!("URL parse error: {err}"))
    }
}

/// A specialized Result type for Colloquy operations.
pub type Result<T> = std::result::Result<T, Error>;
