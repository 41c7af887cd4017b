//! Error type shared across the recall crates

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(thiserror::Error, Debug)]
pub enum MemoryError {
    /// The backend rejected or failed an I/O call.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The backend did not answer within its time bound.
    #[error("store timed out: {0}")]
    StoreTimeout(String),

    /// Rejected at construction time, never per call.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The append is durable; removing the messages that fell out of the
    /// window failed. The next `add` for the same conversation re-attempts
    /// convergence.
    #[error("eviction failed for conversation '{conversation_id}': {reason}")]
    EvictionFailed {
        conversation_id: String,
        reason: String,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_conversation_id() {
        let err = MemoryError::EvictionFailed {
            conversation_id: "conv-1".to_string(),
            reason: "store unavailable: connection reset".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("conv-1"));
        assert!(text.contains("connection reset"));
    }

    #[test]
    fn test_serde_json_error_is_transparent() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let expected = parse_err.to_string();
        let err: MemoryError = parse_err.into();
        assert_eq!(err.to_string(), expected);
    }
}
