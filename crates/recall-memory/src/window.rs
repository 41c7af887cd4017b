//! Sliding-window memory with a protected message class

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use recall_core::{ChatMessage, ConversationMemory, MemoryError, MessageStore, Result, Role};

use crate::locks::ConversationLocks;

/// What happens to messages that fall out of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionMode {
    /// Delete evicted messages from the store after each append. The store
    /// stays bounded and [`MessageStore::get_all`] converges with
    /// [`WindowMemory::get`].
    #[default]
    DeleteEvicted,
    /// Keep the full log in the store for audit and apply the window only
    /// at read time. `get_all` and `get` diverge permanently in this mode.
    FilterOnRead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMemoryConfig {
    /// Upper bound on the retained window. System messages are always
    /// retained, even when they alone exceed this bound. Zero retains only
    /// system messages.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default)]
    pub eviction: EvictionMode,
}

fn default_max_messages() -> usize {
    20
}

impl Default for WindowMemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            eviction: EvictionMode::default(),
        }
    }
}

impl WindowMemoryConfig {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            ..Default::default()
        }
    }

    pub fn with_eviction(mut self, eviction: EvictionMode) -> Self {
        self.eviction = eviction;
        self
    }
}

/// Sliding-window policy over a [`MessageStore`].
///
/// Keeps the most recent messages of a conversation up to
/// `max_messages`, with one carve-out: system messages are never evicted,
/// wherever they fall in the sequence. Among the rest, the oldest go first.
/// The window is recomputed from the stored log on every operation, so it
/// is identical whether eviction ran eagerly or is lagging.
pub struct WindowMemory {
    store: Arc<dyn MessageStore>,
    config: WindowMemoryConfig,
    locks: ConversationLocks,
}

impl WindowMemory {
    pub fn new(store: Arc<dyn MessageStore>, config: WindowMemoryConfig) -> Self {
        Self {
            store,
            config,
            locks: ConversationLocks::new(),
        }
    }

    pub fn with_default_config(store: Arc<dyn MessageStore>) -> Self {
        Self::new(store, WindowMemoryConfig::default())
    }

    pub fn config(&self) -> &WindowMemoryConfig {
        &self.config
    }

    /// Delete everything outside the current window from the store.
    ///
    /// Runs after the append is durable, so any failure here is reported as
    /// [`MemoryError::EvictionFailed`] rather than undoing the add; the
    /// next add for the same conversation recomputes the window from the
    /// full log and re-attempts the cleanup.
    async fn evict(&self, conversation_id: &str) -> Result<()> {
        let log = self
            .store
            .get_all(conversation_id)
            .await
            .map_err(|e| self.eviction_failed(conversation_id, e))?;

        let dropped = dropped_indices(&log, self.config.max_messages);
        if dropped.is_empty() {
            return Ok(());
        }

        self.store
            .delete_messages(conversation_id, &dropped)
            .await
            .map_err(|e| self.eviction_failed(conversation_id, e))?;

        tracing::debug!(
            conversation_id,
            evicted = dropped.len(),
            "evicted messages that fell out of the window"
        );
        Ok(())
    }

    fn eviction_failed(&self, conversation_id: &str, source: MemoryError) -> MemoryError {
        tracing::warn!(
            conversation_id,
            error = %source,
            "append is durable but eviction failed; retrying on next add"
        );
        MemoryError::EvictionFailed {
            conversation_id: conversation_id.to_string(),
            reason: source.to_string(),
        }
    }
}

#[async_trait]
impl ConversationMemory for WindowMemory {
    async fn add_many(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let lock = self.locks.for_conversation(conversation_id);
        let _guard = lock.lock().await;

        self.store.append(conversation_id, messages).await?;

        if self.config.eviction == EvictionMode::DeleteEvicted {
            self.evict(conversation_id).await?;
        }
        Ok(())
    }

    async fn get(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let lock = self.locks.for_conversation(conversation_id);
        let _guard = lock.lock().await;

        let log = self.store.get_all(conversation_id).await?;
        let dropped = dropped_indices(&log, self.config.max_messages);
        if dropped.is_empty() {
            return Ok(log);
        }
        Ok(without_indices(log, &dropped))
    }

    async fn clear(&self, conversation_id: &str) -> Result<()> {
        let lock = self.locks.for_conversation(conversation_id);
        let _guard = lock.lock().await;

        self.store.delete_all(conversation_id).await
    }
}

/// Positions that fall out of a window of `max_messages` over `log`,
/// ascending.
///
/// System messages are never dropped. The remaining budget
/// (`max_messages` minus the system count, floored at zero) keeps the most
/// recent non-system messages, so the oldest are dropped first. An empty
/// result means the full log is retained.
fn dropped_indices(log: &[ChatMessage], max_messages: usize) -> Vec<usize> {
    if log.len() <= max_messages {
        return Vec::new();
    }
    let protected = log.iter().filter(|m| m.role == Role::System).count();
    let budget = max_messages.saturating_sub(protected);
    let mut to_drop = (log.len() - protected).saturating_sub(budget);

    let mut dropped = Vec::with_capacity(to_drop);
    for (index, message) in log.iter().enumerate() {
        if to_drop == 0 {
            break;
        }
        if message.role != Role::System {
            dropped.push(index);
            to_drop -= 1;
        }
    }
    dropped
}

/// `log` minus the given ascending positions, original order preserved.
fn without_indices(log: Vec<ChatMessage>, dropped: &[usize]) -> Vec<ChatMessage> {
    let mut skip = dropped.iter().copied().peekable();
    log.into_iter()
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
        .collect()
}
