//! Client configuration.
//!
//! A [`Config`] is an explicit, immutable value handed to each client at construction.  It can
//! be built in code, read from the environment, loaded from a YAML file, or assembled from
//! command-line arguments parsed with `arrrg`.

use std::env;
use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Sampling temperature sent with every chat request.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default cadence of run status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for calls whose body trickles in over time.
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "COLLOQUY_API_KEY";
/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "COLLOQUY_BASE_URL";
/// Environment variable overriding the model.
pub const MODEL_ENV: &str = "COLLOQUY_MODEL";
/// Environment variable holding the assistant identity.
pub const ASSISTANT_ID_ENV: &str = "COLLOQUY_ASSISTANT_ID";

/// Configuration shared, read-only, by a client and every request it makes.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// Bearer token for the provider.
    pub api_key: String,

    /// Base URL; chat requests go to `<base>/chat/completions`, assistant requests to
    /// `<base>/threads/...`.
    pub base_url: String,

    /// Chat model name.
    pub model: String,

    /// Sampling temperature for chat requests.
    pub temperature: f32,

    /// Assistant identity used when starting runs.
    pub assistant_id: Option<String>,

    /// Delay between run status checks.
    pub poll_interval: Duration,

    /// Overall bound on polling one run.  `None` polls until a terminal state.
    pub max_poll_duration: Option<Duration>,

    /// Connect timeout and timeout for ordinary calls.
    pub request_timeout: Duration,

    /// Timeout for streaming calls.
    pub resource_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("assistant_id", &self.assistant_id)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_duration", &self.max_poll_duration)
            .field("request_timeout", &self.request_timeout)
            .field("resource_timeout", &self.resource_timeout)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with the given API key and default values.
    ///
    /// Defaults:
    /// - Base URL: `https://api.openai.com/v1`
    /// - Model: `gpt-4`
    /// - Temperature: 0.7
    /// - Poll interval: 1s, unbounded
    /// - Timeouts: 60s per call, 120s for streams
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            assistant_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
        }
    }

    /// Build a configuration from `COLLOQUY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| {
            Error::configuration(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var(MODEL_ENV) {
            config.model = model;
        }
        if let Ok(assistant_id) = env::var(ASSISTANT_ID_ENV) {
            config.assistant_id = Some(assistant_id);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    ///
    /// Missing keys take their defaults; a missing `api_key` falls back to `COLLOQUY_API_KEY`.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(yaml)
            .map_err(|err| Error::configuration(format!("invalid config: {err}")))?;
        let api_key = match file.api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::configuration(format!(
                    "api_key not in config and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        let mut config = Self::new(api_key);
        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = file.model {
            config.model = model;
        }
        if let Some(temperature) = file.temperature {
            config.temperature = temperature;
        }
        config.assistant_id = file.assistant_id;
        if let Some(secs) = file.poll_interval {
            config.poll_interval = seconds("poll_interval", secs)?;
        }
        if let Some(secs) = file.max_poll_duration {
            config.max_poll_duration = Some(seconds("max_poll_duration", secs)?);
        }
        if let Some(secs) = file.request_timeout {
            config.request_timeout = seconds("request_timeout", secs)?;
        }
        if let Some(secs) = file.resource_timeout {
            config.resource_timeout = seconds("resource_timeout", secs)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every client relies on.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration("api_key must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(Error::configuration("model must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::configuration("poll_interval must be positive"));
        }
        url::Url::parse(&self.base_url)?;
        Ok(())
    }

    /// The assistant identity, or a configuration error if none is set.
    pub fn require_assistant_id(&self) -> Result<&str> {
        self.assistant_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::configuration("assistant_id is required by the assistant client"))
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the assistant identity.
    pub fn with_assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }

    /// Sets the delay between run status checks.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bounds how long one run may be polled.
    pub fn with_max_poll_duration(mut self, max_poll_duration: Option<Duration>) -> Self {
        self.max_poll_duration = max_poll_duration;
        self
    }

    /// Sets the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the streaming-call timeout.
    pub fn with_resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    assistant_id: Option<String>,
    poll_interval: Option<f64>,
    max_poll_duration: Option<f64>,
    request_timeout: Option<f64>,
    resource_timeout: Option<f64>,
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|err| Error::configuration(format!("{field}: {err}")))
}

/// Command-line arguments for the colloquy-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Path to a YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-4)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Talk to an assistant thread instead of the chat endpoint.
    #[arrrg(flag, "Use the assistant/thread client")]
    pub assistant: bool,

    /// Assistant identity for runs.
    #[arrrg(optional, "Assistant identity used to start runs", "ID")]
    pub assistant_id: Option<String>,

    /// File that remembers the assistant thread between sessions.
    #[arrrg(optional, "File holding the last thread id", "PATH")]
    pub thread_file: Option<String>,
}

impl ChatArgs {
    /// Resolve the arguments into a [`Config`], layering flags over file and environment.
    pub fn into_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::from_env()?,
        };
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(assistant_id) = &self.assistant_id {
            config.assistant_id = Some(assistant_id.clone());
        }
        config.validate()?;
        Ok(config)
    }
}
