//! Conversation memory for LLM applications
//!
//! `recall` keeps an unbounded, append-only message log per conversation in
//! a pluggable store and surfaces a bounded working window back to the
//! caller. The window slides over the most recent messages; system messages
//! are never evicted, wherever they fall in the sequence.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use recall::{ChatMessage, ConversationMemory, InMemoryMessageStore, WindowMemory,
//!     WindowMemoryConfig};
//!
//! # async fn demo() -> recall::Result<()> {
//! let store = Arc::new(InMemoryMessageStore::new());
//! let memory = WindowMemory::new(store, WindowMemoryConfig::new(20));
//!
//! let conversation = recall::new_conversation_id();
//! memory.add(&conversation, ChatMessage::system("You are terse.")).await?;
//! memory.add(&conversation, ChatMessage::user("hello")).await?;
//!
//! let window = memory.get(&conversation).await?;
//! # let _ = window;
//! # Ok(())
//! # }
//! ```

pub mod error {
    pub use recall_core::{MemoryError, Result};
}

pub mod message {
    pub use recall_core::{ChatMessage, Role};
}

pub mod memory {
    pub use recall_core::ConversationMemory;
    pub use recall_memory::{EvictionMode, WindowMemory, WindowMemoryConfig};
}

pub mod storage {
    pub use recall_core::MessageStore;
    pub use recall_storage::{
        FileMessageStore, InMemoryMessageStore, StorageConfig, create_store,
    };

    #[cfg(feature = "sqlite")]
    pub use recall_storage::SqliteMessageStore;

    #[cfg(feature = "redis-storage")]
    pub use recall_storage::RedisMessageStore;
}

pub use error::{MemoryError, Result};
pub use memory::{ConversationMemory, EvictionMode, WindowMemory, WindowMemoryConfig};
pub use message::{ChatMessage, Role};
pub use storage::{
    FileMessageStore, InMemoryMessageStore, MessageStore, StorageConfig, create_store,
};

#[cfg(feature = "sqlite")]
pub use storage::SqliteMessageStore;

#[cfg(feature = "redis-storage")]
pub use storage::RedisMessageStore;

/// Mint a fresh conversation id.
///
/// Conversations come into being on first write, so any unique string
/// works as a key; this is a convenience for callers that do not already
/// have a session identifier.
pub fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
