//! chat_core - Core types for the branching-chat system
//!
//! This crate provides the foundational types used across all chat-related crates:
//! - `message` - Message, Role and the wire shape sent to the model
//! - `conversation` - Conversation metadata and the flat thread description

pub mod conversation;
pub mod message;

// Re-export commonly used types
pub use conversation::{Conversation, ThreadTreeItem};
pub use message::{ChatMessage, Message, Role};
