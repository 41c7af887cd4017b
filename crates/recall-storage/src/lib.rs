//! Storage backends for the recall conversation-memory library

mod file;
mod in_memory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "redis-storage")]
mod redis;

pub use file::FileMessageStore;
pub use in_memory::InMemoryMessageStore;
pub use recall_core::{MemoryError, MessageStore, Result};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMessageStore;

#[cfg(feature = "redis-storage")]
pub use redis::RedisMessageStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Backend selection, deserializable from application config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File { path: String },
    #[serde(rename = "sqlite")]
    Sqlite { path: String },
    #[serde(rename = "redis")]
    Redis {
        url: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        ttl_seconds: Option<u64>,
    },
}

pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn MessageStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryMessageStore::new())),

        StorageConfig::File { path } => Ok(Arc::new(FileMessageStore::new(path))),

        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            let store = SqliteMessageStore::new(path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "sqlite"))]
        StorageConfig::Sqlite { .. } => Err(MemoryError::InvalidConfiguration(
            "SQLite storage requires 'sqlite' feature".into(),
        )),

        #[cfg(feature = "redis-storage")]
        StorageConfig::Redis {
            url,
            prefix,
            ttl_seconds,
        } => {
            let mut store = RedisMessageStore::new(url)?;
            if let Some(p) = prefix {
                store = store.with_prefix(p);
            }
            if let Some(ttl) = ttl_seconds {
                store = store.with_ttl(*ttl);
            }
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "redis-storage"))]
        StorageConfig::Redis { .. } => Err(MemoryError::InvalidConfiguration(
            "Redis storage requires 'redis-storage' feature".into(),
        )),
    }
}
