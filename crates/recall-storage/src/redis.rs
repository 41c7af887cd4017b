//! Redis message store

use async_trait::async_trait;
use redis::AsyncCommands;

use recall_core::{ChatMessage, MemoryError, MessageStore, Result};

/// Message log as one Redis list per conversation, plus a set of known
/// conversation ids. A whole batch goes out in a single `RPUSH`, so batch
/// order is atomic with respect to concurrent appends.
pub struct RedisMessageStore {
    client: redis::Client,
    prefix: String,
    default_ttl: Option<u64>,
}

impl RedisMessageStore {
    pub fn new(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| MemoryError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            client,
            prefix: "recall:".to_string(),
            default_ttl: None,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Expire a conversation's log this many seconds after its last append.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = Some(ttl_seconds);
        self
    }

    fn log_key(&self, conversation_id: &str) -> String {
        format!("{}log:{}", self.prefix, conversation_id)
    }

    fn conversations_key(&self) -> String {
        format!("{}conversations", self.prefix)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)
    }
}

fn map_redis_error(e: redis::RedisError) -> MemoryError {
    if e.is_timeout() {
        MemoryError::StoreTimeout(e.to_string())
    } else {
        MemoryError::StoreUnavailable(e.to_string())
    }
}

#[async_trait]
impl MessageStore for RedisMessageStore {
    async fn append(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;

        let mut encoded = Vec::with_capacity(messages.len());
        for message in &messages {
            encoded.push(serde_json::to_string(message)?);
        }

        let log_key = self.log_key(conversation_id);
        let conversations_key = self.conversations_key();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.rpush(&log_key, encoded);
        pipe.sadd(&conversations_key, conversation_id);
        if let Some(ttl) = self.default_ttl {
            pipe.expire(&log_key, ttl as i64);
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn get_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let mut conn = self.get_connection().await?;
        let log_key = self.log_key(conversation_id);

        let raw: Vec<String> = conn.lrange(&log_key, 0, -1).await.map_err(map_redis_error)?;
        raw.iter()
            .map(|data| serde_json::from_str(data).map_err(MemoryError::from))
            .collect()
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let log_key = self.log_key(conversation_id);
        let conversations_key = self.conversations_key();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&log_key);
        pipe.srem(&conversations_key, conversation_id);
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete_messages(&self, conversation_id: &str, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;
        let log_key = self.log_key(conversation_id);

        let raw: Vec<String> = conn.lrange(&log_key, 0, -1).await.map_err(map_redis_error)?;
        let mut skip = indices.iter().copied().peekable();
        let retained: Vec<String> = raw
            .into_iter()
            .enumerate()
            .filter(|(index, _)| {
                if skip.peek() == Some(index) {
                    skip.next();
                    false
                } else {
                    true
                }
            })
            .map(|(_, data)| data)
            .collect();

        // Rewrite the list in one transaction so readers never observe the
        // gap between the delete and the re-push.
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&log_key);
        if !retained.is_empty() {
            pipe.rpush(&log_key, retained);
            if let Some(ttl) = self.default_ttl {
                pipe.expire(&log_key, ttl as i64);
            }
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let conversations_key = self.conversations_key();

        let ids: Vec<String> = conn
            .smembers(&conversations_key)
            .await
            .map_err(map_redis_error)?;
        Ok(ids)
    }
}
