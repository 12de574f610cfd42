//! Profile rows and synchronization

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::auth::User;
use crate::error::Error;
use crate::Backend;

/// Table holding one profile row per user
pub const PROFILE_TABLE: &str = "profiles";

/// A profile row
///
/// The row key is the id of the owning user, one row per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Row key, the id of the owning user
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Avatar image URL
    pub avatar_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Write payload for profile upserts
///
/// Timestamps the database owns are left out so the server defaults
/// apply on first insert and existing values survive a merge.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileChange {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileChange {
    pub fn new(id: Uuid, name: &str, avatar_url: Option<&str>) -> Self {
        Self {
            id,
            name: name.to_string(),
            avatar_url: avatar_url.map(str::to_string),
            updated_at: Utc::now(),
        }
    }
}

/// Derive the display name for a first-time profile
///
/// Preference order is the name captured at sign-up, then the local part
/// of the email address, then "User".
pub fn default_name(user: &User) -> String {
    if let Some(name) = user.user_metadata.get("name").and_then(|v| v.as_str()) {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    if let Some(email) = user.email.as_deref() {
        if let Some(local) = email.split('@').next() {
            if !local.is_empty() {
                return local.to_string();
            }
        }
    }
    "User".to_string()
}

/// Keeps a user's profile row in step with the database
///
/// Fetches the row on demand, seeds it on first sign-in, and holds the
/// last known copy for rendering. Failures are logged and returned, the
/// held copy is never clobbered by a failed write.
pub struct ProfileSync {
    backend: Backend,
    current: Arc<RwLock<Option<Profile>>>,
}

impl ProfileSync {
    /// Create a new synchronizer
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch the profile row for a user, creating it on first sign-in
    ///
    /// A missing row is not an error. It means the user has never had a
    /// profile, so one is seeded with a derived name through an atomic
    /// upsert keyed on the user id. Concurrent first sign-ins therefore
    /// converge on the same row instead of racing.
    pub async fn fetch_or_create(&self, user: &User) -> Result<Profile, Error> {
        let id = user.parsed_id()?;

        let existing = self
            .backend
            .from(PROFILE_TABLE)
            .select("*")
            .eq("id", id)
            .execute_one::<Profile>()
            .await
            .map_err(|error| {
                warn!("profile fetch failed for {}: {}", id, error);
                error
            })?;

        if let Some(profile) = existing {
            self.adopt(profile.clone());
            return Ok(profile);
        }

        let change = ProfileChange::new(id, &default_name(user), None);

        let rows: Vec<Profile> = self
            .backend
            .from(PROFILE_TABLE)
            .insert(&change)
            .on_conflict("id")
            .execute()
            .await
            .map_err(|error| {
                warn!("profile seed failed for {}: {}", id, error);
                error
            })?;

        let profile = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::general("profile seed returned no rows"))?;
        self.adopt(profile.clone());
        Ok(profile)
    }

    /// Rename the held profile
    ///
    /// The held copy is only replaced once the database write succeeds,
    /// so a failed rename leaves the last good state visible.
    pub async fn update_name(&self, name: &str) -> Result<Profile, Error> {
        let current = self
            .current()
            .ok_or_else(|| Error::general("no profile loaded"))?;

        let payload = serde_json::json!({"name": name, "updated_at": Utc::now()});

        let rows: Vec<Profile> = self
            .backend
            .from(PROFILE_TABLE)
            .update(&payload)
            .eq("id", current.id)
            .execute()
            .await
            .map_err(|error| {
                warn!("profile rename failed for {}: {}", current.id, error);
                error
            })?;

        let profile = rows.into_iter().next().unwrap_or_else(|| {
            let mut updated = current.clone();
            updated.name = name.to_string();
            updated
        });
        self.adopt(profile.clone());
        Ok(profile)
    }

    /// The last fetched profile, if any
    pub fn current(&self) -> Option<Profile> {
        let guard = self.current.read().unwrap();
        guard.clone()
    }

    /// The name to render, with a placeholder when no profile is held
    pub fn display_name(&self) -> String {
        self.current()
            .map(|profile| profile.name)
            .unwrap_or_else(|| "Not set".to_string())
    }

    fn adopt(&self, profile: Profile) {
        let mut guard = self.current.write().unwrap();
        *guard = Some(profile);
    }
}
