use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use recall_core::{ChatMessage, MessageStore, Result};

/// Reference store backed by a process-local map.
///
/// The map is owned by the store instance and handed to the policy layer
/// explicitly; there is no ambient global. Cloning shares the underlying
/// map, so one handle can drive the policy while another inspects state.
pub struct InMemoryMessageStore {
    conversations: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryMessageStore {
    fn clone(&self) -> Self {
        Self {
            conversations: Arc::clone(&self.conversations),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        let mut conversations = self.conversations.write();
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn get_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let conversations = self.conversations.read();
        Ok(conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<()> {
        self.conversations.write().remove(conversation_id);
        Ok(())
    }

    async fn delete_messages(&self, conversation_id: &str, indices: &[usize]) -> Result<()> {
        let mut conversations = self.conversations.write();
        if let Some(log) = conversations.get_mut(conversation_id) {
            let mut skip = indices.iter().copied().peekable();
            let mut index = 0usize;
            log.retain(|_| {
                let keep = skip.peek() != Some(&index);
                if !keep {
                    skip.next();
                }
                index += 1;
                keep
            });
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        Ok(self.conversations.read().keys().cloned().collect())
    }
}
