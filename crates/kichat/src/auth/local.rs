//! In-memory accounts, for guest runs and tests

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::credentials::{
    duplicate_account, invalid_credentials, new_salt, normalize_email, password_digest,
    validate_registration,
};
use super::{AuthBackend, Session, User};
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Clone)]
struct Account {
    user: User,
    salt: String,
    digest: String,
}

#[derive(Debug, Default)]
struct BackendState {
    // keyed by lowercased email
    accounts: HashMap<String, Account>,
    // token -> user id
    sessions: HashMap<String, String>,
}

/// Process-local auth backend; accounts are gone when it is dropped
#[derive(Debug, Default)]
pub struct LocalAuthBackend {
    state: RwLock<BackendState>,
}

impl LocalAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }
}

#[async_trait]
impl AuthBackend for LocalAuthBackend {
    async fn register(&self, email: &str, password: &str, name: &str) -> ChatResult<User> {
        let key = validate_registration(email, password)?;

        let mut state = self.state.write();
        if state.accounts.contains_key(&key) {
            return Err(duplicate_account());
        }

        let salt = new_salt();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: key.clone(),
            name: name.trim().to_string(),
        };
        state.accounts.insert(
            key,
            Account {
                user: user.clone(),
                digest: password_digest(&salt, password),
                salt,
            },
        );
        debug!("registered user {}", user.id);
        Ok(user)
    }

    async fn create_session(&self, email: &str, password: &str) -> ChatResult<Session> {
        let key = normalize_email(email);
        let mut state = self.state.write();
        let user_id = match state.accounts.get(&key) {
            Some(account) if password_digest(&account.salt, password) == account.digest => {
                account.user.id.clone()
            }
            _ => return Err(invalid_credentials()),
        };

        let token = Uuid::new_v4().to_string();
        state.sessions.insert(token.clone(), user_id.clone());
        Ok(Session { token, user_id })
    }

    async fn current_user(&self, session: &Session) -> ChatResult<User> {
        let state = self.state.read();
        let user_id = state
            .sessions
            .get(&session.token)
            .ok_or(ChatError::NotAuthenticated)?;
        state
            .accounts
            .values()
            .find(|account| &account.user.id == user_id)
            .map(|account| account.user.clone())
            .ok_or(ChatError::NotAuthenticated)
    }

    async fn delete_session(&self, session: &Session) -> ChatResult<()> {
        self.state
            .write()
            .sessions
            .remove(&session.token)
            .map(|_| ())
            .ok_or(ChatError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_sign_in() {
        let backend = LocalAuthBackend::new();
        let user = backend
            .register("Ada@Example.com", "correct horse", "Ada")
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        let session = backend
            .create_session("ada@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(backend.current_user(&session).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let backend = LocalAuthBackend::new();
        backend.register("a@b.c", "password1", "A").await.unwrap();
        let err = backend.create_session("a@b.c", "password2").await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(_)));
        assert!(backend.create_session("x@b.c", "password1").await.is_err());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let backend = LocalAuthBackend::new();
        assert!(backend.register("a@b.c", "short", "A").await.is_err());
        assert!(backend.register("not-an-email", "password1", "A").await.is_err());

        backend.register("a@b.c", "password1", "A").await.unwrap();
        let err = backend.register("A@B.C", "password2", "A2").await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(_)));
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let backend = LocalAuthBackend::new();
        backend.register("a@b.c", "same-password", "A").await.unwrap();
        backend.register("d@e.f", "same-password", "D").await.unwrap();
        let state = backend.state.read();
        let digests: Vec<&str> = state.accounts.values().map(|a| a.digest.as_str()).collect();
        assert_ne!(digests[0], digests[1]);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let backend = LocalAuthBackend::new();
        backend.register("a@b.c", "password1", "A").await.unwrap();
        let session = backend.create_session("a@b.c", "password1").await.unwrap();

        backend.delete_session(&session).await.unwrap();
        assert_eq!(backend.session_count(), 0);
        assert!(matches!(
            backend.current_user(&session).await,
            Err(ChatError::NotAuthenticated)
        ));
    }
}
