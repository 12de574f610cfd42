//! Types for TableClient

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::Error;

/// Error body returned by the row API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// The error code
    pub code: Option<String>,

    /// The error message
    pub message: Option<String>,

    /// Detailed error description
    pub details: Option<String>,

    /// A hint on how to resolve the error
    pub hint: Option<String>,
}

/// Map a failed row API response into a database error
pub(crate) fn db_error(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => Error::Database {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed.message.unwrap_or_else(|| body.to_string()),
            details: parsed.details,
            hint: parsed.hint,
        },
        Err(_) => Error::Database {
            status: status.as_u16(),
            code: None,
            message: body.to_string(),
            details: None,
            hint: None,
        },
    }
}
