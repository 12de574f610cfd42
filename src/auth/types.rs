//! Types for authentication and user management

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::session::Session;

/// User data as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The app metadata
    #[serde(default)]
    pub app_metadata: HashMap<String, serde_json::Value>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,

    /// The user's email address
    pub email: Option<String>,

    /// The user's phone number
    pub phone: Option<String>,

    /// When the email was confirmed
    pub email_confirmed_at: Option<String>,

    /// The last sign-in time
    pub last_sign_in_at: Option<String>,

    /// The creation time
    pub created_at: String,

    /// The update time
    pub updated_at: String,

    /// The user's role
    pub role: Option<String>,
}

impl User {
    /// The user id parsed as a UUID, the form row tables key on
    pub fn parsed_id(&self) -> Result<Uuid, Error> {
        Uuid::parse_str(&self.id)
            .map_err(|_| Error::auth(format!("user id is not a UUID: {}", self.id)))
    }
}

/// Authentication response
///
/// Sign-up returns a session when the project auto-confirms accounts and
/// a bare user while email confirmation is pending.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    /// The user data
    pub user: Option<User>,

    /// The session data, absent while confirmation is pending
    pub session: Option<Session>,
}

impl AuthResponse {
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        if value.get("access_token").is_some() {
            let mut session: Session = serde_json::from_value(value)?;
            session.resolve_expiry();
            let user = session.user.clone();
            Ok(Self {
                user: Some(user),
                session: Some(session),
            })
        } else {
            let user: User = serde_json::from_value(value)?;
            Ok(Self {
                user: Some(user),
                session: None,
            })
        }
    }
}

/// Kinds of authentication state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established
    SignedIn,

    /// The session was ended
    SignedOut,

    /// The access token was renewed
    TokenRefreshed,
}

/// A state transition broadcast to subscribers
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    /// What happened
    pub event: AuthEvent,

    /// The session after the transition, if any
    pub session: Option<Session>,
}

/// Magic link delivery settings
#[derive(Debug, Clone)]
pub struct MagicLinkOptions {
    /// Whether to create an account for an unknown email
    pub create_user: bool,

    /// Where the link should land after verification
    pub redirect_to: Option<String>,
}

impl Default for MagicLinkOptions {
    fn default() -> Self {
        Self {
            create_user: true,
            redirect_to: None,
        }
    }
}
