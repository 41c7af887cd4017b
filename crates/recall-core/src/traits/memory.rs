//! Memory policy trait

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ChatMessage;

/// Decides which subset of a stored conversation log is surfaced back to
/// the caller.
///
/// Implementations own the write path (append plus whatever eviction they
/// perform) and the read path (the retained view). Alternative strategies,
/// such as a similarity-search-backed memory, substitute here without any
/// change to callers.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Append one message, then apply the retention policy.
    async fn add(&self, conversation_id: &str, message: ChatMessage) -> Result<()> {
        self.add_many(conversation_id, vec![message]).await
    }

    /// Append a batch in order, then apply the retention policy once.
    async fn add_many(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()>;

    /// The currently retained messages, oldest first. Unknown conversations
    /// yield an empty Vec, never an error.
    async fn get(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    /// Drop all stored messages and policy state for the conversation.
    /// Idempotent.
    async fn clear(&self, conversation_id: &str) -> Result<()>;
}
