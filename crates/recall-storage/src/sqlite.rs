//! SQLite message store

use std::str::FromStr;

use async_trait::async_trait;

use recall_core::{ChatMessage, MemoryError, MessageStore, Result};

/// Message log in a SQLite table keyed by `(conversation_id, seq)`.
///
/// The pool holds a single connection: `append` reads the next sequence
/// number and inserts behind it in one transaction, and SQLite allows only
/// one writer at a time anyway.
pub struct SqliteMessageStore {
    pool: sqlx::SqlitePool,
}

impl SqliteMessageStore {
    pub async fn new(path: &str) -> Result<Self> {
        let pool = Self::connect(path).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    async fn connect(path: &str) -> Result<sqlx::SqlitePool> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::InvalidConfiguration(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                conversation_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (conversation_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!("message store migrations applied");
        Ok(())
    }
}

fn map_sqlx_error(e: sqlx::Error) -> MemoryError {
    if matches!(e, sqlx::Error::PoolTimedOut) {
        MemoryError::StoreTimeout(e.to_string())
    } else {
        MemoryError::StoreUnavailable(e.to_string())
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let (next_seq,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM messages WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for (offset, message) in messages.iter().enumerate() {
            let data = serde_json::to_string(message)?;
            sqlx::query("INSERT INTO messages (conversation_id, seq, data) VALUES (?, ?, ?)")
                .bind(conversation_id)
                .bind(next_seq + offset as i64)
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn get_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM messages WHERE conversation_id = ? ORDER BY seq ASC")
                .bind(conversation_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(MemoryError::from))
            .collect()
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_messages(&self, conversation_id: &str, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // seq values are not contiguous after earlier deletions; map the
        // requested positions onto the current seq order first.
        let seqs: Vec<(i64,)> =
            sqlx::query_as("SELECT seq FROM messages WHERE conversation_id = ? ORDER BY seq ASC")
                .bind(conversation_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        for &index in indices {
            if let Some((seq,)) = seqs.get(index) {
                sqlx::query("DELETE FROM messages WHERE conversation_id = ? AND seq = ?")
                    .bind(conversation_id)
                    .bind(seq)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT conversation_id FROM messages ORDER BY conversation_id")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_get_all() {
        let store = SqliteMessageStore::in_memory().await.unwrap();

        store
            .append(
                "conv",
                vec![ChatMessage::system("rules"), ChatMessage::user("hello")],
            )
            .await
            .unwrap();
        store
            .append("conv", vec![ChatMessage::assistant("hi")])
            .await
            .unwrap();

        let log = store.get_all("conv").await.unwrap();
        let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["rules", "hello", "hi"]);
        assert_eq!(log[0].role, recall_core::Role::System);
    }

    #[tokio::test]
    async fn test_get_all_unknown_is_empty() {
        let store = SqliteMessageStore::in_memory().await.unwrap();
        assert!(store.get_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_is_idempotent() {
        let store = SqliteMessageStore::in_memory().await.unwrap();
        store
            .append("conv", vec![ChatMessage::user("hello")])
            .await
            .unwrap();

        store.delete_all("conv").await.unwrap();
        store.delete_all("conv").await.unwrap();
        assert!(store.get_all("conv").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_messages_with_sparse_seqs() {
        let store = SqliteMessageStore::in_memory().await.unwrap();
        store
            .append(
                "conv",
                vec![
                    ChatMessage::user("a"),
                    ChatMessage::user("b"),
                    ChatMessage::user("c"),
                    ChatMessage::user("d"),
                ],
            )
            .await
            .unwrap();

        // Punch a hole in the seq sequence, then delete by position again.
        store.delete_messages("conv", &[1]).await.unwrap();
        store.delete_messages("conv", &[0, 1]).await.unwrap();

        let log = store.get_all("conv").await.unwrap();
        let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["d"]);
    }

    #[tokio::test]
    async fn test_append_after_deleting_everything() {
        let store = SqliteMessageStore::in_memory().await.unwrap();
        store
            .append("conv", vec![ChatMessage::user("a")])
            .await
            .unwrap();
        store.delete_messages("conv", &[0]).await.unwrap();
        store
            .append("conv", vec![ChatMessage::user("b")])
            .await
            .unwrap();

        let log = store.get_all("conv").await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].content, "b");
    }

    #[tokio::test]
    async fn test_list_conversations() {
        let store = SqliteMessageStore::in_memory().await.unwrap();
        store
            .append("conv-2", vec![ChatMessage::user("b")])
            .await
            .unwrap();
        store
            .append("conv-1", vec![ChatMessage::user("a")])
            .await
            .unwrap();

        let ids = store.list_conversations().await.unwrap();
        assert_eq!(ids, ["conv-1", "conv-2"]);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("recall.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteMessageStore::new(path).await.unwrap();
            store
                .append("conv", vec![ChatMessage::user("durable")])
                .await
                .unwrap();
        }

        let store = SqliteMessageStore::new(path).await.unwrap();
        let log = store.get_all("conv").await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].content, "durable");
    }
}
