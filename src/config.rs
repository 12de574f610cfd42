//! Configuration for the CVDesk client

use crate::error::Error;
use std::time::Duration;
use url::Url;

/// Environment variable naming the backend project URL
pub const ENV_BACKEND_URL: &str = "CVDESK_BACKEND_URL";

/// Environment variable naming the publishable API key
pub const ENV_ANON_KEY: &str = "CVDESK_ANON_KEY";

/// Connection settings for a backend project
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
}

impl BackendConfig {
    /// Create a new configuration, validating the URL
    pub fn new(url: &str, anon_key: &str) -> Result<Self, Error> {
        let url = Url::parse(url)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
        })
    }

    /// Load configuration from the environment, reading a `.env` file if present
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        let url = std::env::var(ENV_BACKEND_URL).map_err(|_| {
            Error::config(format!("{} environment variable not found", ENV_BACKEND_URL))
        })?;
        let anon_key = std::env::var(ENV_ANON_KEY).map_err(|_| {
            Error::config(format!("{} environment variable not found", ENV_ANON_KEY))
        })?;
        Self::new(&url, &anon_key)
    }
}

/// Behaviour options for the CVDesk client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to automatically refresh an expired token
    pub auto_refresh_token: bool,

    /// Whether to keep the active session in the client mirror
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The storage bucket holding resume files
    pub resume_bucket: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            resume_bucket: "resumes".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set whether to automatically refresh an expired token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the storage bucket holding resume files
    pub fn with_resume_bucket(mut self, value: &str) -> Self {
        self.resume_bucket = value.to_string();
        self
    }
}
