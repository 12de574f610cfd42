//! Types for storage operations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file in a storage bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    /// The file name
    pub name: String,

    /// The bucket ID
    pub bucket_id: Option<String>,

    /// Owner user ID
    pub owner: Option<String>,

    /// The file ID
    pub id: Option<String>,

    /// Creation timestamp
    pub created_at: Option<String>,

    /// Update timestamp
    pub updated_at: Option<String>,

    /// Last accessed timestamp
    pub last_accessed_at: Option<String>,

    /// File metadata
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Options for uploading a file
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// Cache control header
    pub cache_control: Option<String>,

    /// Content type of the file
    pub content_type: Option<String>,

    /// Whether to overwrite an existing object at the same path
    pub upsert: bool,
}

/// Options for listing files
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of files to return
    pub limit: Option<i32>,

    /// Offset for pagination
    pub offset: Option<i32>,

    /// Filter names by a search term
    pub search: Option<String>,

    /// Sort column and direction
    pub sort_by: Option<SortBy>,
}

/// Sort column and direction for listing files
#[derive(Debug, Clone, Serialize)]
pub struct SortBy {
    /// The column to sort on
    pub column: String,

    /// The sort direction
    pub order: SortOrder,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order
    Asc,

    /// Descending order
    Desc,
}

/// Request body for listing files
#[derive(Debug, Serialize)]
pub(crate) struct ListBody<'a> {
    pub prefix: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(rename = "sortBy", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

/// Response for an upload request
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// The object key, `bucket/path`
    #[serde(rename = "Key")]
    pub key: Option<String>,

    /// The object ID
    #[serde(rename = "Id")]
    pub id: Option<String>,
}

/// Response for a signed URL request
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SignedUrlResponse {
    /// The signed path, relative to the storage root
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}
