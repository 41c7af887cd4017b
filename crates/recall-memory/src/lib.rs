//! Memory policies for the recall conversation-memory library

mod locks;
mod window;

pub use recall_core::ConversationMemory;
pub use window::{EvictionMode, WindowMemory, WindowMemoryConfig};
