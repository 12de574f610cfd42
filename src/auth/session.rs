//! Session management for authentication

use crate::error::Error;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::User;

/// Claims carried in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject, the user id
    pub sub: String,

    /// Expiry as a unix timestamp
    pub exp: i64,

    /// Email address at the time the token was issued
    pub email: Option<String>,
}

/// An authenticated session issued by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    pub token_type: String,

    /// The token lifetime in seconds
    pub expires_in: i64,

    /// The expiry timestamp
    pub expires_at: Option<i64>,

    /// The user the session belongs to
    pub user: User,
}

impl Session {
    /// The id of the user the session belongs to
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// The email of the user the session belongs to
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() >= expires_at,
            None => false,
        }
    }

    /// Decode the claims embedded in the access token
    ///
    /// The token is not validated here. Verification happens server side,
    /// this only mirrors what the provider put into the token.
    pub fn claims(&self) -> Result<AccessClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<AccessClaims>(
            &self.access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(data.claims)
    }

    /// Fill in `expires_at` when the provider response omitted it
    ///
    /// Prefers the `exp` claim from the token, falling back to the
    /// lifetime relative to the local clock.
    pub(crate) fn resolve_expiry(&mut self) {
        if self.expires_at.is_some() {
            return;
        }
        self.expires_at = match self.claims() {
            Ok(claims) => Some(claims.exp),
            Err(_) => Some(unix_now() + self.expires_in),
        };
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}
