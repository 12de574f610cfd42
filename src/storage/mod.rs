//! Storage operations for file uploads and downloads

mod types;

use bytes::Bytes;
use reqwest::{multipart, Client, Response};
use std::path::Path;

use crate::error::Error;
use crate::fetch::{Fetch, CLIENT_INFO};

pub use types::*;

/// Client for the hosted blob store
pub struct StorageClient {
    /// The base URL for the backend project
    url: String,

    /// The publishable API key for the backend project
    key: String,

    /// The bearer token sent with requests
    bearer: String,

    /// HTTP client used for requests
    client: Client,
}

/// Client for a specific storage bucket
pub struct BucketClient<'a> {
    /// Reference to the storage client
    storage: &'a StorageClient,

    /// The bucket ID
    bucket_id: String,
}

impl StorageClient {
    /// Create a new StorageClient
    pub(crate) fn new(url: &str, key: &str, bearer: String, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            bearer,
            client,
        }
    }

    /// Get the base URL for storage operations
    fn get_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    /// Get a client for a specific bucket
    pub fn from(&self, bucket_id: &str) -> BucketClient {
        BucketClient {
            storage: self,
            bucket_id: bucket_id.to_string(),
        }
    }
}

impl<'a> BucketClient<'a> {
    /// Upload a file to the bucket
    pub async fn upload(
        &self,
        path: &str,
        data: Bytes,
        options: FileOptions,
    ) -> Result<UploadResponse, Error> {
        let url = self
            .storage
            .get_url(&format!("/object/{}/{}", self.bucket_id, path));

        let file_name = Path::new(path)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        let mut part = multipart::Part::stream(data).file_name(file_name);
        if let Some(content_type) = &options.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self
            .storage
            .client
            .post(&url)
            .header("apikey", &self.storage.key)
            .header("Authorization", format!("Bearer {}", self.storage.bearer))
            .header("X-Client-Info", CLIENT_INFO)
            .header(
                "Cache-Control",
                options.cache_control.unwrap_or_else(|| "3600".to_string()),
            )
            .header("x-upsert", options.upsert.to_string())
            .multipart(form)
            .send()
            .await?;

        let response = check(response, "Upload").await?;
        let uploaded = response.json::<UploadResponse>().await?;
        Ok(uploaded)
    }

    /// Upload a file from disk to the bucket
    pub async fn upload_file(
        &self,
        path: &str,
        file_path: &Path,
        options: FileOptions,
    ) -> Result<UploadResponse, Error> {
        let data = tokio::fs::read(file_path)
            .await
            .map_err(|e| Error::storage(format!("Failed to read {}: {}", file_path.display(), e)))?;
        self.upload(path, Bytes::from(data), options).await
    }

    /// Download a file from the bucket
    pub async fn download(&self, path: &str) -> Result<Bytes, Error> {
        let url = self
            .storage
            .get_url(&format!("/object/{}/{}", self.bucket_id, path));

        let response = Fetch::get(&self.storage.client, &url)
            .api_key(&self.storage.key)
            .bearer_auth(&self.storage.bearer)
            .send()
            .await?;

        let response = check(response, "Download").await?;
        let bytes = response.bytes().await?;
        Ok(bytes)
    }

    /// List files under a prefix in the bucket
    pub async fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<FileObject>, Error> {
        let url = self
            .storage
            .get_url(&format!("/object/list/{}", self.bucket_id));

        let body = ListBody {
            prefix,
            limit: options.limit,
            offset: options.offset,
            search: options.search,
            sort_by: options.sort_by,
        };

        let response = Fetch::post(&self.storage.client, &url)
            .api_key(&self.storage.key)
            .bearer_auth(&self.storage.bearer)
            .json(&body)?
            .send()
            .await?;

        let response = check(response, "List").await?;
        let files = response.json::<Vec<FileObject>>().await?;
        Ok(files)
    }

    /// Create a signed URL granting temporary access to a file
    pub async fn create_signed_url(&self, path: &str, expires_in: i64) -> Result<String, Error> {
        let url = self
            .storage
            .get_url(&format!("/object/sign/{}/{}", self.bucket_id, path));

        let body = serde_json::json!({"expiresIn": expires_in});

        let response = Fetch::post(&self.storage.client, &url)
            .api_key(&self.storage.key)
            .bearer_auth(&self.storage.bearer)
            .json(&body)?
            .send()
            .await?;

        let response = check(response, "Sign").await?;
        let signed = response.json::<SignedUrlResponse>().await?;
        Ok(format!("{}{}", self.storage.get_url(""), signed.signed_url))
    }

    /// Get the public URL for a file
    pub fn get_public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.storage.url, self.bucket_id, path
        )
    }
}

async fn check(response: Response, operation: &str) -> Result<Response, Error> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(Error::storage(format!(
            "{} failed with status {}: {}",
            operation, status, text
        )));
    }
    Ok(response)
}
