use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use super::{AuthBackend, Session, User};
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    user: Option<User>,
}

/// Signed-in identity for one client
///
/// Cloning shares the same state.
#[derive(Clone)]
pub struct AuthContext {
    backend: Arc<dyn AuthBackend>,
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(AuthState::default())),
        }
    }

    /// Current user, if signed in
    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().user.is_some()
    }

    /// Id of the current user, or `NotAuthenticated`
    pub fn require_user_id(&self) -> ChatResult<String> {
        self.state
            .read()
            .user
            .as_ref()
            .map(|user| user.id.clone())
            .ok_or(ChatError::NotAuthenticated)
    }

    /// Re-validate the held session; the user is cleared when the lookup fails
    pub async fn check(&self) -> Option<User> {
        let session = self.state.read().session.clone();
        let Some(session) = session else {
            self.state.write().user = None;
            return None;
        };

        match self.backend.current_user(&session).await {
            Ok(user) => {
                self.state.write().user = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                debug!("session check failed: {}", e);
                let mut state = self.state.write();
                state.session = None;
                state.user = None;
                None
            }
        }
    }

    /// Create a session, then load the user behind it
    pub async fn login(&self, email: &str, password: &str) -> ChatResult<User> {
        let session = self.backend.create_session(email, password).await?;
        let user = self.backend.current_user(&session).await?;
        info!("signed in as {}", user.email);

        let mut state = self.state.write();
        state.session = Some(session);
        state.user = Some(user.clone());
        Ok(user)
    }

    /// Create an account, then sign in with it
    pub async fn register(&self, email: &str, password: &str, name: &str) -> ChatResult<User> {
        self.backend.register(email, password, name).await?;
        self.login(email, password).await
    }

    /// End the current session
    pub async fn logout(&self) -> ChatResult<()> {
        let session = self
            .state
            .read()
            .session
            .clone()
            .ok_or(ChatError::NotAuthenticated)?;
        self.backend.delete_session(&session).await?;

        let mut state = self.state.write();
        state.session = None;
        state.user = None;
        Ok(())
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &self.user())
            .finish()
    }
}
