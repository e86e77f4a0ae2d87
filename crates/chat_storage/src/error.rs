//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
