//! Resume rows, uploads, and the store that tracks them

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::auth::User;
use crate::error::Error;
use crate::storage::FileOptions;
use crate::Backend;

/// Table holding resume metadata rows
pub const RESUME_TABLE: &str = "resumes";

/// Lifecycle of an uploaded resume
///
/// New uploads always start as `Uploaded`. The later states are written
/// by the enhancement pipeline and only read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Uploaded,
    Processing,
    Enhanced,
    Failed,
}

/// A resume row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    /// Row key
    pub id: Uuid,

    /// The owning user
    pub user_id: Uuid,

    /// File name as chosen by the user
    pub original_file_name: String,

    /// File name of the enhanced rendition, once one exists
    pub enhanced_file_name: Option<String>,

    /// Object key in the blob store
    pub storage_path: String,

    /// Public URL of the stored file
    pub file_url: String,

    /// File size in bytes
    pub file_size: i64,

    /// Content type of the file
    pub file_type: String,

    /// Job description the resume targets
    pub job_description: Option<String>,

    /// Lifecycle state
    pub status: ResumeStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Write payload for new resume rows
///
/// The row key and creation timestamp are left to the server.
#[derive(Debug, Clone, Serialize)]
struct NewResume {
    user_id: Uuid,
    original_file_name: String,
    storage_path: String,
    file_url: String,
    file_size: i64,
    file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_description: Option<String>,
    status: ResumeStatus,
}

/// A file handed to the uploader
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File name as chosen by the user
    pub file_name: String,

    /// Content type of the file
    pub content_type: String,

    /// The file contents
    pub bytes: Bytes,

    /// Job description the resume targets
    pub job_description: Option<String>,
}

/// Where an uploaded blob landed
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Object key in the blob store
    pub path: String,

    /// Public URL of the stored file
    pub public_url: String,
}

/// Moves resume bytes into the blob store
///
/// `ResumeStore` goes through this seam for the transfer itself, so the
/// mechanism can be swapped out without touching the bookkeeping.
#[async_trait]
pub trait UploadHandler: Send + Sync {
    /// Transfer the file and report where it landed
    async fn transfer(&self, owner: Uuid, request: &UploadRequest) -> Result<StoredObject, Error>;
}

/// Default handler writing to the project's resume bucket
pub struct StorageUploader {
    backend: Backend,
    bucket: String,
}

impl StorageUploader {
    /// Create a handler for the bucket named in the client options
    pub fn new(backend: Backend) -> Self {
        let bucket = backend.options.resume_bucket.clone();
        Self { backend, bucket }
    }
}

#[async_trait]
impl UploadHandler for StorageUploader {
    async fn transfer(&self, owner: Uuid, request: &UploadRequest) -> Result<StoredObject, Error> {
        let path = object_path(owner, &request.file_name);

        let options = FileOptions {
            content_type: Some(request.content_type.clone()),
            ..FileOptions::default()
        };

        let storage = self.backend.storage();
        let bucket = storage.from(&self.bucket);
        bucket.upload(&path, request.bytes.clone(), options).await?;

        let public_url = bucket.get_public_url(&path);
        Ok(StoredObject { path, public_url })
    }
}

/// Object key for an upload, namespaced by owner with a fresh id
///
/// The original file name only contributes its extension. Everything
/// else is replaced so user input never shapes storage keys.
fn object_path(owner: Uuid, file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!("{}/{}.{}", owner, Uuid::new_v4(), extension)
}

/// Tracks one user's resumes
///
/// Holds the rows newest first. Uploads transfer the blob, insert the
/// metadata row, and prepend the returned row to the held list instead
/// of re-fetching the whole set.
pub struct ResumeStore {
    backend: Backend,
    owner: Uuid,
    uploader: Arc<dyn UploadHandler>,
    items: Arc<RwLock<Vec<Resume>>>,
}

impl ResumeStore {
    /// Create a store for a user's resumes
    pub fn new(backend: Backend, user: &User) -> Result<Self, Error> {
        let owner = user.parsed_id()?;
        let uploader = Arc::new(StorageUploader::new(backend.clone()));
        Ok(Self {
            backend,
            owner,
            uploader,
            items: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Swap the upload handler
    pub fn with_upload_handler(mut self, uploader: Arc<dyn UploadHandler>) -> Self {
        self.uploader = uploader;
        self
    }

    /// Fetch all of the user's resume rows, newest first
    pub async fn load(&self) -> Result<Vec<Resume>, Error> {
        let rows: Vec<Resume> = self
            .backend
            .from(RESUME_TABLE)
            .select("*")
            .eq("user_id", self.owner)
            .order("created_at", false)
            .execute()
            .await
            .map_err(|error| {
                warn!("resume list failed for {}: {}", self.owner, error);
                error
            })?;

        {
            let mut guard = self.items.write().unwrap();
            *guard = rows.clone();
        }
        Ok(rows)
    }

    /// The held rows, newest first
    pub fn list(&self) -> Vec<Resume> {
        let guard = self.items.read().unwrap();
        guard.clone()
    }

    /// Upload a resume file and record its metadata row
    ///
    /// Nothing is recorded when either step fails, a stray blob without
    /// a row is preferable to a row pointing at nothing.
    pub async fn upload(&self, request: UploadRequest) -> Result<Resume, Error> {
        let stored = self.uploader.transfer(self.owner, &request).await?;

        let row = NewResume {
            user_id: self.owner,
            original_file_name: request.file_name.clone(),
            storage_path: stored.path.clone(),
            file_url: stored.public_url,
            file_size: request.bytes.len() as i64,
            file_type: request.content_type.clone(),
            job_description: request.job_description.clone(),
            status: ResumeStatus::Uploaded,
        };

        let rows: Vec<Resume> = self
            .backend
            .from(RESUME_TABLE)
            .insert(&row)
            .execute()
            .await
            .map_err(|error| {
                warn!("resume insert failed for {}: {}", self.owner, error);
                error
            })?;

        let resume = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::general("resume insert returned no rows"))?;

        {
            let mut guard = self.items.write().unwrap();
            guard.insert(0, resume.clone());
        }
        debug!("recorded resume {} at {}", resume.id, resume.storage_path);
        Ok(resume)
    }

    /// Download the stored file for a resume
    pub async fn download(&self, resume: &Resume) -> Result<Bytes, Error> {
        let storage = self.backend.storage();
        storage
            .from(&self.backend.options.resume_bucket)
            .download(&resume.storage_path)
            .await
    }
}
