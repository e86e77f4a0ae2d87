//! Orchestrator error types

use thiserror::Error;

use chat_storage::StorageError;
use chat_stream::StreamError;
use thread_tree::ThreadTreeError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("no conversation loaded")]
    NoConversation,

    #[error("message not found: {0}")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("tree error: {0}")]
    Tree(#[from] ThreadTreeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
