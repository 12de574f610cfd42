//! Application-wide session state
//!
//! `SessionContext` owns the reactive view of authentication: consumers
//! watch a state channel instead of polling, and every transition flows
//! through the provider's state-change events. The context is handed to
//! the components that need it rather than living in a global.

use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::{AuthResponse, MagicLinkOptions, Session, User};
use crate::error::Error;
use crate::profile::{Profile, ProfileChange, PROFILE_TABLE};
use crate::Backend;

/// A snapshot of the authentication state
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Whether the initial session resolution is still in flight
    pub loading: bool,

    /// The signed-in user, if any
    pub user: Option<User>,

    /// The active session, if any
    pub session: Option<Session>,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            loading: true,
            user: None,
            session: None,
        }
    }

    fn resolved(session: Option<Session>) -> Self {
        let user = session.as_ref().map(|s| s.user.clone());
        Self {
            loading: false,
            user,
            session,
        }
    }

    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the session lifecycle for an application
///
/// Created once at startup with [`SessionContext::init`] and torn down
/// with [`SessionContext::close`]. Internally a listener task applies
/// provider state-change events to a watch channel, so sign-out in one
/// place clears the session everywhere that watches.
pub struct SessionContext {
    backend: Backend,
    state: Arc<watch::Sender<SessionState>>,
    listener: JoinHandle<()>,
}

impl SessionContext {
    /// Initialize the context and start listening for state changes
    ///
    /// The state starts as loading. The listener resolves any previously
    /// established session, refreshing an expired one when the client is
    /// configured to, and then applies provider events as they arrive.
    pub fn init(backend: Backend) -> Self {
        let (tx, _) = watch::channel(SessionState::loading());
        let state = Arc::new(tx);
        let mut events = backend.auth().on_state_change();

        let listener = tokio::spawn({
            let state = Arc::clone(&state);
            let backend = backend.clone();
            async move {
                let initial = match backend.auth().current_session().await {
                    Ok(session) => session,
                    Err(error) => {
                        warn!("session resolution failed: {}", error);
                        backend.auth().get_session()
                    }
                };
                state.send_replace(SessionState::resolved(initial));

                loop {
                    match events.recv().await {
                        Ok(change) => {
                            debug!("applying auth state change: {:?}", change.event);
                            state.send_replace(SessionState::resolved(change.session));
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("session listener lagged, dropped {} events", skipped);
                            let session = backend.auth().get_session();
                            state.send_replace(SessionState::resolved(session));
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });

        Self {
            backend,
            state,
            listener,
        }
    }

    /// Subscribe to session state changes
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The current state snapshot
    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// The active session, if any
    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// Whether the initial session resolution is still in flight
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Register a new account
    ///
    /// `name`, when given, is stored as user metadata and later seeds the
    /// profile row. The state updates through the provider event once a
    /// session exists.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, Error> {
        let data = name.map(|name| serde_json::json!({"name": name}));
        self.backend.auth().sign_up(email, password, data).await
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), Error> {
        self.backend.auth().sign_in_with_password(email, password).await?;
        Ok(())
    }

    /// Request a magic link for passwordless sign-in
    pub async fn sign_in_with_magic_link(&self, email: &str) -> Result<(), Error> {
        self.backend
            .auth()
            .sign_in_with_otp(email, MagicLinkOptions::default())
            .await
    }

    /// Sign out the current user
    ///
    /// Local state is not cleared here. The provider emits a signed-out
    /// event and the listener clears the state when it arrives.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.backend.auth().sign_out().await
    }

    /// Write the signed-in user's profile row
    ///
    /// A single atomic upsert keyed on the user id creates the row when
    /// it is missing and merges the change when it exists.
    pub async fn update_profile(
        &self,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<Profile, Error> {
        let session = self
            .backend
            .auth()
            .get_session()
            .ok_or_else(|| Error::auth("Not signed in"))?;
        let id = session.user.parsed_id()?;

        let change = ProfileChange::new(id, name, avatar_url);

        let rows: Vec<Profile> = self
            .backend
            .from(PROFILE_TABLE)
            .insert(&change)
            .on_conflict("id")
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general("profile upsert returned no rows"))
    }

    /// Tear the context down, stopping the listener task
    pub fn close(self) {
        self.listener.abort();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_state_mirrors_the_session() {
        let state = SessionState::resolved(None);
        assert!(!state.loading);
        assert!(!state.is_authenticated());
        assert!(state.session.is_none());
    }

    #[test]
    fn init_resolves_an_empty_mirror_without_requests() {
        tokio_test::block_on(async {
            let backend = Backend::new("http://localhost:0", "test-key");
            let ctx = SessionContext::init(backend);

            let mut rx = ctx.state();
            while rx.borrow().loading {
                rx.changed().await.unwrap();
            }

            assert!(!rx.borrow().is_authenticated());
            ctx.close();
        });
    }
}
