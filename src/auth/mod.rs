//! Authentication and session management for the CVDesk backend

mod session;
mod types;

use log::debug;
use reqwest::{Client, Response};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;

pub use session::*;
pub use types::*;

/// Client for the hosted identity provider
pub struct Auth {
    /// The base URL for the backend project
    url: String,

    /// The publishable API key for the backend project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session mirror
    session: Arc<RwLock<Option<Session>>>,

    /// Broadcast channel for state transitions
    events: broadcast::Sender<AuthStateChange>,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub(crate) fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            events,
            options,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Sign up a new user with email and password
    ///
    /// `data` is stored as user metadata on the new account. Depending on
    /// project settings the response carries either a live session or a
    /// bare user awaiting email confirmation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<serde_json::Value>,
    ) -> Result<AuthResponse, Error> {
        let url = self.get_auth_url("/signup");

        let payload = match data {
            Some(data) => json!({"email": email, "password": password, "data": data}),
            None => json!({"email": email, "password": password}),
        };

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&payload)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let value = response.json::<serde_json::Value>().await?;
        let result = AuthResponse::from_value(value)?;

        if let Some(session) = &result.session {
            self.store_session(Some(session.clone()), AuthEvent::SignedIn);
        }

        Ok(result)
    }

    /// Sign in a user with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, Error> {
        let url = self.get_auth_url("/token?grant_type=password");

        let payload = json!({"email": email, "password": password});

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&payload)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let mut session: Session = response.json().await?;
        session.resolve_expiry();
        self.store_session(Some(session.clone()), AuthEvent::SignedIn);

        Ok(session)
    }

    /// Request a magic link for passwordless sign-in
    ///
    /// The provider emails a one-time link. No session is established
    /// until the link token is verified.
    pub async fn sign_in_with_otp(
        &self,
        email: &str,
        options: MagicLinkOptions,
    ) -> Result<(), Error> {
        let url = self.get_auth_url("/otp");

        let mut request = Fetch::post(&self.client, &url).api_key(&self.key);
        if let Some(redirect) = &options.redirect_to {
            let mut params = HashMap::new();
            params.insert("redirect_to".to_string(), redirect.clone());
            request = request.query(params);
        }

        let payload = json!({"email": email, "create_user": options.create_user});

        let response = request.json(&payload)?.send().await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        debug!("magic link requested for {}", email);
        Ok(())
    }

    /// Exchange a magic link token for a session
    pub async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, Error> {
        let url = self.get_auth_url("/verify");

        let payload = json!({"type": "magiclink", "email": email, "token": token});

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&payload)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let mut session: Session = response.json().await?;
        session.resolve_expiry();
        self.store_session(Some(session.clone()), AuthEvent::SignedIn);

        Ok(session)
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session, Error> {
        let refresh_token = {
            let guard = self.session.read().unwrap();
            match guard.as_ref() {
                Some(session) => session.refresh_token.clone(),
                None => return Err(Error::auth("Not logged in")),
            }
        };

        let url = self.get_auth_url("/token?grant_type=refresh_token");

        let payload = json!({"refresh_token": refresh_token});

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&payload)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let mut session: Session = response.json().await?;
        session.resolve_expiry();
        self.store_session(Some(session.clone()), AuthEvent::TokenRefreshed);

        Ok(session)
    }

    /// Sign out the current user
    pub async fn sign_out(&self) -> Result<(), Error> {
        let token = {
            let guard = self.session.read().unwrap();
            match guard.as_ref() {
                Some(session) => session.access_token.clone(),
                None => return Err(Error::auth("Not logged in")),
            }
        };

        let url = self.get_auth_url("/logout");

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        self.store_session(None, AuthEvent::SignedOut);

        Ok(())
    }

    /// Get the user data for the currently authenticated user
    pub async fn get_user(&self) -> Result<User, Error> {
        let token = {
            let guard = self.session.read().unwrap();
            match guard.as_ref() {
                Some(session) => session.access_token.clone(),
                None => return Err(Error::auth("Not logged in")),
            }
        };

        let url = self.get_auth_url("/user");

        let response = Fetch::get(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let user = response.json::<User>().await?;
        Ok(user)
    }

    /// Send a password recovery email
    pub async fn reset_password_for_email(&self, email: &str) -> Result<(), Error> {
        let url = self.get_auth_url("/recover");

        let payload = json!({"email": email});

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&payload)?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        Ok(())
    }

    /// Get the current session from the mirror
    pub fn get_session(&self) -> Option<Session> {
        let guard = self.session.read().unwrap();
        guard.clone()
    }

    /// Adopt an externally persisted session
    pub fn set_session(&self, mut session: Session) {
        session.resolve_expiry();
        self.store_session(Some(session), AuthEvent::SignedIn);
    }

    /// The access token of the current session, if any
    pub fn access_token(&self) -> Option<String> {
        let guard = self.session.read().unwrap();
        guard.as_ref().map(|session| session.access_token.clone())
    }

    /// Get the current session, refreshing it first when it has expired
    pub async fn current_session(&self) -> Result<Option<Session>, Error> {
        let session = match self.get_session() {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() && self.options.auto_refresh_token {
            let refreshed = self.refresh_session().await?;
            return Ok(Some(refreshed));
        }

        Ok(Some(session))
    }

    /// Subscribe to authentication state transitions
    pub fn on_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }

    fn store_session(&self, session: Option<Session>, event: AuthEvent) {
        if self.options.persist_session || session.is_none() {
            let mut guard = self.session.write().unwrap();
            *guard = session.clone();
        }
        // Nobody listening is fine
        let _ = self.events.send(AuthStateChange { event, session });
    }
}

/// Map a failed provider response into an authentication error
async fn auth_error(response: Response) -> Error {
    let text = response.text().await.unwrap_or_default();
    Error::Auth(provider_message(&text))
}

/// Pull the human readable message out of a provider error body
///
/// Provider errors come in a few shapes depending on the endpoint. The
/// message is preserved verbatim, the raw body is the fallback.
fn provider_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_provider_messages() {
        assert_eq!(
            provider_message(r#"{"error_description":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            provider_message(r#"{"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            provider_message(r#"{"code":400,"message":"Signup requires a valid password"}"#),
            "Signup requires a valid password"
        );
        assert_eq!(provider_message("plain failure"), "plain failure");
    }
}
