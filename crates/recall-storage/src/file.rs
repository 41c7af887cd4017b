use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::{ChatMessage, MessageStore, Result};

/// File-backed store keeping one JSON file per conversation.
///
/// Appends read-modify-write the conversation file, so each conversation
/// has its own async mutex; distinct conversations do not contend.
pub struct FileMessageStore {
    base_path: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileMessageStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn conversation_path(&self, conversation_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", conversation_id))
    }

    fn lock_for(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn read_log(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let path = self.conversation_path(conversation_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?;
        let log = serde_json::from_str(&json)?;
        Ok(log)
    }

    async fn write_log(&self, conversation_id: &str, log: &[ChatMessage]) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?;
        let path = self.conversation_path(conversation_id);
        let json = serde_json::to_string_pretty(log)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for FileMessageStore {
    async fn append(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let mut log = self.read_log(conversation_id).await?;
        log.extend(messages);
        self.write_log(conversation_id, &log).await
    }

    async fn get_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        self.read_log(conversation_id).await
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<()> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let path = self.conversation_path(conversation_id);
        if path.exists() {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn delete_messages(&self, conversation_id: &str, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let log = self.read_log(conversation_id).await?;
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
        self.write_log(conversation_id, &retained).await
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        let mut conversations = Vec::new();
        if !self.base_path.exists() {
            return Ok(conversations);
        }

        let mut entries = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| recall_core::MemoryError::StoreUnavailable(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    conversations.push(name.to_string_lossy().to_string());
                }
            }
        }
        Ok(conversations)
    }
}
