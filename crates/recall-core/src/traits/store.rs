//! Storage trait for conversation logs

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ChatMessage;

/// Durable, conversation-scoped append log.
///
/// A store persists messages under an opaque conversation key and returns
/// them in insertion order. It holds no retention policy; deciding which
/// messages constitute "memory" is the policy layer's job.
///
/// Backends must serialize appends per conversation: a single batch is
/// never interleaved with a concurrent batch, and no concurrent batch is
/// lost. Nothing is guaranteed across distinct conversations.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a batch in order. No reordering, no deduplication.
    async fn append(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()>;

    /// Full log for the conversation, oldest first. Unknown ids yield an
    /// empty Vec, never an error.
    async fn get_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    /// Remove the conversation's entire log. Idempotent.
    async fn delete_all(&self, conversation_id: &str) -> Result<()>;

    /// Remove the messages at the given positions (ascending, 0-based, in
    /// `get_all` order).
    ///
    /// The default implementation rewrites the log via `delete_all` plus a
    /// re-append; backends should override it with an atomic variant where
    /// the underlying storage allows one.
    async fn delete_messages(&self, conversation_id: &str, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let log = self.get_all(conversation_id).await?;
        let mut skip = indices.iter().copied().peekable();
        let retained: Vec<ChatMessage> = log
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
            .map(|(_, message)| message)
            .collect();
        self.delete_all(conversation_id).await?;
        if !retained.is_empty() {
            self.append(conversation_id, retained).await?;
        }
        Ok(())
    }

    /// All known conversation ids. Maintenance and inspection only, not
    /// part of the hot path.
    async fn list_conversations(&self) -> Result<Vec<String>>;
}
