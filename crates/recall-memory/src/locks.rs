use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Registry handing out one async mutex per conversation id.
///
/// The outer map lock is held only to look up or insert an entry; the
/// per-id mutex is held across store I/O. Entries live for the life of the
/// registry, so two callers can never end up holding different locks for
/// the same id.
pub(crate) struct ConversationLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn for_conversation(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock();
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_yields_same_lock() {
        let locks = ConversationLocks::new();
        let a = locks.for_conversation("conv");
        let b = locks.for_conversation("conv");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_ids_yield_distinct_locks() {
        let locks = ConversationLocks::new();
        let a = locks.for_conversation("conv-1");
        let b = locks.for_conversation("conv-2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_contend() {
        let locks = ConversationLocks::new();
        let a = locks.for_conversation("conv-1");
        let _held = a.lock().await;

        let b = locks.for_conversation("conv-2");
        assert!(b.try_lock().is_ok());
    }
}
