//! SQLite chat store
//!
//! Timestamps are stored as microseconds since the Unix epoch. `rowid` breaks
//! ties between records written within the same microsecond.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::{ChatRecord, ChatStore, MessageRecord};
use crate::conversation::Role;
use crate::error::{ChatError, ChatResult};

const CREATE_CHATS: &str = "
    CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        owner TEXT NOT NULL,
        title TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )";

const CREATE_MESSAGES: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
    )";

const CREATE_CHATS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_chats_owner ON chats(owner, created_at)";

const CREATE_MESSAGES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, timestamp)";

type ChatRow = (String, String, String, i64);
type MessageRow = (String, String, String, String, i64);

/// Chat store backed by a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    /// Open (or create) the database file at `path`
    pub async fn open(path: &Path) -> ChatResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ChatError::persistence(format!("cannot create {:?}: {}", parent, e))
                })?;
            }
        }

        info!("opening chat store at {:?}", path);
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database, dropped with the store
    pub async fn in_memory() -> ChatResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> ChatResult<Self> {
        for statement in [
            CREATE_CHATS,
            CREATE_MESSAGES,
            CREATE_CHATS_INDEX,
            CREATE_MESSAGES_INDEX,
        ] {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Connection pool, for other tables kept in the same database
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn chat_exists(&self, id: &str) -> ChatResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM chats WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

fn to_micros(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

fn from_micros(micros: i64) -> ChatResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| ChatError::persistence(format!("invalid timestamp {}", micros)))
}

fn chat_from_row((id, owner, title, created_at): ChatRow) -> ChatResult<ChatRecord> {
    Ok(ChatRecord {
        id,
        owner,
        title,
        created_at: from_micros(created_at)?,
    })
}

fn message_from_row((id, chat_id, role, content, timestamp): MessageRow) -> ChatResult<MessageRecord> {
    Ok(MessageRecord {
        id,
        chat_id,
        role: Role::from_str(&role).map_err(ChatError::persistence)?,
        content,
        timestamp: from_micros(timestamp)?,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn list_chats(&self, owner: &str, limit: usize) -> ChatResult<Vec<ChatRecord>> {
        let rows: Vec<ChatRow> = sqlx::query_as(
            "SELECT id, owner, title, created_at FROM chats
             WHERE owner = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(owner)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(chat_from_row).collect()
    }

    async fn create_chat(&self, owner: &str, title: &str) -> ChatResult<ChatRecord> {
        let chat = ChatRecord {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO chats (id, owner, title, created_at) VALUES (?, ?, ?, ?)")
            .bind(&chat.id)
            .bind(&chat.owner)
            .bind(&chat.title)
            .bind(to_micros(chat.created_at))
            .execute(&self.pool)
            .await?;
        // round-trip precision
        Ok(ChatRecord {
            created_at: from_micros(to_micros(chat.created_at))?,
            ..chat
        })
    }

    async fn delete_chat(&self, id: &str) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::NotFound(format!("chat {}", id)));
        }
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str, limit: usize) -> ChatResult<Vec<MessageRecord>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, chat_id, role, content, timestamp FROM messages
             WHERE chat_id = ?
             ORDER BY timestamp ASC, rowid ASC
             LIMIT ?",
        )
        .bind(chat_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
    ) -> ChatResult<MessageRecord> {
        if !self.chat_exists(chat_id).await? {
            return Err(ChatError::NotFound(format!("chat {}", chat_id)));
        }
        let timestamp = from_micros(to_micros(Utc::now()))?;
        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        };
        sqlx::query(
            "INSERT INTO messages (id, chat_id, role, content, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(to_micros(message.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    async fn delete_message(&self, id: &str) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::NotFound(format!("message {}", id)));
        }
        Ok(())
    }
}
