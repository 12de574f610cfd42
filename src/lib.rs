//! CVDesk Client Library
//!
//! A Rust client for the CVDesk resume platform backend, providing access
//! to the hosted identity provider, the row API, and the blob store, plus
//! the session, profile, and resume components built on top of them.

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod fetch;
pub mod profile;
pub mod resume;
pub mod storage;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::Auth;
use crate::config::{BackendConfig, ClientOptions};
use crate::db::TableClient;
use crate::error::Error;
use crate::storage::StorageClient;

/// The main entry point for the CVDesk client
///
/// A `Backend` is cheap to clone. Components take their own clone at
/// construction time and share the session mirror through it.
#[derive(Clone)]
pub struct Backend {
    /// The base URL for the backend project
    pub url: String,
    /// The publishable API key for the backend project
    pub key: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-in and session management
    auth: Arc<Auth>,
    /// Client options
    pub options: ClientOptions,
}

impl Backend {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use cvdesk_client::Backend;
    ///
    /// let backend = Backend::new("https://project.example.com", "publishable-key");
    /// ```
    pub fn new(url: &str, key: &str) -> Self {
        Self::new_with_options(url, key, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use cvdesk_client::{Backend, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_auto_refresh_token(false);
    /// let backend = Backend::new_with_options(
    ///     "https://project.example.com",
    ///     "publishable-key",
    ///     options,
    /// );
    /// ```
    pub fn new_with_options(url: &str, key: &str, options: ClientOptions) -> Self {
        let http_client = match options.request_timeout {
            Some(timeout) => Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            None => Client::new(),
        };

        let auth = Auth::new(url, key, http_client.clone(), options.clone());

        Self {
            url: url.to_string(),
            key: key.to_string(),
            http_client,
            auth: Arc::new(auth),
            options,
        }
    }

    /// Create a new client from the environment
    ///
    /// Reads `CVDESK_BACKEND_URL` and `CVDESK_ANON_KEY`, loading a `.env`
    /// file first if one is present.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cvdesk_client::Backend;
    ///
    /// let backend = Backend::from_env()?;
    /// # Ok::<(), cvdesk_client::error::Error>(())
    /// ```
    pub fn from_env() -> Result<Self, Error> {
        let config = BackendConfig::from_env()?;
        Ok(Self::new(config.url.as_str(), &config.anon_key))
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Create a TableClient for row operations on a specific table or view
    ///
    /// Requests run as the signed-in user when a session is active, and
    /// anonymously otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use cvdesk_client::Backend;
    ///
    /// let backend = Backend::new("https://project.example.com", "publishable-key");
    /// let query = backend.from("profiles");
    /// ```
    pub fn from(&self, table: &str) -> TableClient {
        TableClient::new(
            &self.url,
            &self.key,
            table,
            self.bearer(),
            self.http_client.clone(),
        )
    }

    /// Get a client for the blob store
    pub fn storage(&self) -> StorageClient {
        StorageClient::new(&self.url, &self.key, self.bearer(), self.http_client.clone())
    }

    fn bearer(&self) -> String {
        self.auth
            .access_token()
            .unwrap_or_else(|| self.key.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::context::{SessionContext, SessionState};
    pub use crate::error::Error;
    pub use crate::profile::{Profile, ProfileSync};
    pub use crate::resume::{Resume, ResumeStatus, ResumeStore};
    pub use crate::Backend;
}
