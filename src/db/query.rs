//! Query builders for TableClient

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::db::types::db_error;
use crate::error::Error;
use crate::fetch::Fetch;

/// Base query builder
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Query parameters
    params: HashMap<String, String>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
        }
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    /// The base URL for the request
    url: String,

    /// The API key
    key: String,

    /// The bearer token
    bearer: String,

    /// HTTP client
    client: Client,

    /// Query builder
    query: QueryBuilder,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(url: String, key: String, bearer: String, columns: &str, client: Client) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);

        Self {
            url,
            key,
            bearer,
            client,
            query,
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        let filter = format!("eq.{}", value.to_string());
        self.query.add_param(column, &filter);
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query.add_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: i32) -> Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    /// Execute the query and return the matching rows
    pub async fn execute<T: DeserializeOwned>(self) -> Result<Vec<T>, Error> {
        let response = Fetch::get(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(&self.bearer)
            .query(self.query.get_params().clone())
            .send()
            .await?;

        parse_rows(response).await
    }

    /// Execute the query and return the first matching row, if any
    pub async fn execute_one<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        let results = self.limit(1).execute::<T>().await?;
        Ok(results.into_iter().next())
    }
}

/// Builder for INSERT queries
///
/// With an `on_conflict` column the insert becomes an atomic upsert,
/// merging the payload into the existing row in a single request.
pub struct InsertBuilder<T: Serialize> {
    /// The base URL for the request
    url: String,

    /// The API key
    key: String,

    /// The bearer token
    bearer: String,

    /// The values to insert
    values: T,

    /// HTTP client
    client: Client,

    /// Query builder
    query: QueryBuilder,

    /// Conflict target column
    on_conflict: Option<String>,
}

impl<T: Serialize> InsertBuilder<T> {
    /// Create a new InsertBuilder
    pub fn new(url: String, key: String, bearer: String, values: T, client: Client) -> Self {
        Self {
            url,
            key,
            bearer,
            values,
            client,
            query: QueryBuilder::new(),
            on_conflict: None,
        }
    }

    /// Turn the insert into an upsert keyed on the given column
    pub fn on_conflict(mut self, column: &str) -> Self {
        self.query.add_param("on_conflict", column);
        self.on_conflict = Some(column.to_string());
        self
    }

    fn prefer(&self, ret: &str) -> String {
        match self.on_conflict {
            Some(_) => format!("resolution=merge-duplicates,return={}", ret),
            None => format!("return={}", ret),
        }
    }

    /// Execute the query and return the written rows
    pub async fn execute<R: DeserializeOwned>(self) -> Result<Vec<R>, Error> {
        let response = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(&self.bearer)
            .header("Prefer", &self.prefer("representation"))
            .query(self.query.get_params().clone())
            .json(&self.values)?
            .send()
            .await?;

        parse_rows(response).await
    }

    /// Execute the query without returning the written rows
    pub async fn execute_no_return(self) -> Result<(), Error> {
        let response = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(&self.bearer)
            .header("Prefer", &self.prefer("minimal"))
            .query(self.query.get_params().clone())
            .json(&self.values)?
            .send()
            .await?;

        check_status(response).await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    /// The base URL for the request
    url: String,

    /// The API key
    key: String,

    /// The bearer token
    bearer: String,

    /// The values to update
    values: T,

    /// HTTP client
    client: Client,

    /// Query builder
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(url: String, key: String, bearer: String, values: T, client: Client) -> Self {
        Self {
            url,
            key,
            bearer,
            values,
            client,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        let filter = format!("eq.{}", value.to_string());
        self.query.add_param(column, &filter);
        self
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(self) -> Result<Vec<R>, Error> {
        let response = Fetch::patch(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(&self.bearer)
            .header("Prefer", "return=representation")
            .query(self.query.get_params().clone())
            .json(&self.values)?
            .send()
            .await?;

        parse_rows(response).await
    }

    /// Execute the query without returning the updated rows
    pub async fn execute_no_return(self) -> Result<(), Error> {
        let response = Fetch::patch(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(&self.bearer)
            .header("Prefer", "return=minimal")
            .query(self.query.get_params().clone())
            .json(&self.values)?
            .send()
            .await?;

        check_status(response).await
    }
}

async fn parse_rows<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(db_error(status, &text));
    }

    let result = response.json::<T>().await?;
    Ok(result)
}

async fn check_status(response: Response) -> Result<(), Error> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(db_error(status, &text));
    }
    Ok(())
}
