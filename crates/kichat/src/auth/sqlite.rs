//! Accounts and sessions in SQLite
//!
//! Shares its database with [`crate::store::SqliteChatStore`], so user ids
//! that own stored chats survive a restart.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::credentials::{
    duplicate_account, invalid_credentials, new_salt, normalize_email, password_digest,
    validate_registration,
};
use super::{AuthBackend, Session, User};
use crate::error::{ChatError, ChatResult};

const CREATE_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        salt TEXT NOT NULL,
        digest TEXT NOT NULL
    )";

const CREATE_SESSIONS: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )";

/// Auth backend backed by a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteAuthBackend {
    pool: SqlitePool,
}

impl SqliteAuthBackend {
    /// Use an open pool, creating the account tables if needed
    pub async fn with_pool(pool: SqlitePool) -> ChatResult<Self> {
        for statement in [CREATE_USERS, CREATE_SESSIONS] {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!("auth tables ready");
        Ok(Self { pool })
    }

    pub async fn session_count(&self) -> ChatResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl AuthBackend for SqliteAuthBackend {
    async fn register(&self, email: &str, password: &str, name: &str) -> ChatResult<User> {
        let key = validate_registration(email, password)?;
        let salt = new_salt();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: key,
            name: name.trim().to_string(),
        };

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, salt, digest) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&salt)
        .bind(password_digest(&salt, password))
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                debug!("registered user {}", user.id);
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(duplicate_account()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_session(&self, email: &str, password: &str) -> ChatResult<Session> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, salt, digest FROM users WHERE email = ?")
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?;
        let user_id = match row {
            Some((id, salt, digest)) if password_digest(&salt, password) == digest => id,
            _ => return Err(invalid_credentials()),
        };

        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?, ?)")
            .bind(&token)
            .bind(&user_id)
            .execute(&self.pool)
            .await?;
        Ok(Session { token, user_id })
    }

    async fn current_user(&self, session: &Session) -> ChatResult<User> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT u.id, u.email, u.name FROM sessions s \
             JOIN users u ON u.id = s.user_id WHERE s.token = ?",
        )
        .bind(&session.token)
        .fetch_optional(&self.pool)
        .await?;
        let (id, email, name) = row.ok_or(ChatError::NotAuthenticated)?;
        Ok(User { id, email, name })
    }

    async fn delete_session(&self, session: &Session) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(&session.token)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::NotAuthenticated);
        }
        Ok(())
    }
}
