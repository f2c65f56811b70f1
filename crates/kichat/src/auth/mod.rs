//! Authentication
//!
//! An [`AuthBackend`] owns accounts and sessions. [`AuthContext`] holds the
//! signed-in identity for one client and is shared with the chat controller.
//! [`SqliteAuthBackend`] keeps accounts next to the stored chats they own;
//! [`LocalAuthBackend`] forgets them when the process exits.

mod context;
mod credentials;
mod local;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatResult;

pub use context::AuthContext;
pub use credentials::MIN_PASSWORD_LEN;
pub use local::LocalAuthBackend;
pub use sqlite::SqliteAuthBackend;

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Opaque session handle issued by a backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

/// Account and session management
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(&self, email: &str, password: &str, name: &str) -> ChatResult<User>;

    /// Email and password sign-in
    async fn create_session(&self, email: &str, password: &str) -> ChatResult<Session>;

    async fn current_user(&self, session: &Session) -> ChatResult<User>;

    async fn delete_session(&self, session: &Session) -> ChatResult<()>;
}
