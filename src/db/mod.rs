//! Database operations through the hosted row API

mod query;
mod types;

use reqwest::Client;
use serde::Serialize;

pub use query::*;
pub use types::*;

/// Client for row operations against a single table
pub struct TableClient {
    /// The base URL for the backend project
    url: String,

    /// The publishable API key for the backend project
    key: String,

    /// The table or view name
    table: String,

    /// The bearer token sent with requests
    ///
    /// This is the access token of the active session, or the API key
    /// itself for anonymous access. Row level policies decide what each
    /// of those may touch.
    bearer: String,

    /// HTTP client
    client: Client,
}

impl TableClient {
    /// Create a new TableClient
    pub(crate) fn new(url: &str, key: &str, table: &str, bearer: String, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            table: table.to_string(),
            bearer,
            client,
        }
    }

    /// Get the base URL for row API requests
    fn get_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(
            self.get_url(),
            self.key.clone(),
            self.bearer.clone(),
            columns,
            self.client.clone(),
        )
    }

    /// Insert rows into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(
            self.get_url(),
            self.key.clone(),
            self.bearer.clone(),
            values,
            self.client.clone(),
        )
    }

    /// Update rows in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(
            self.get_url(),
            self.key.clone(),
            self.bearer.clone(),
            values,
            self.client.clone(),
        )
    }
}
