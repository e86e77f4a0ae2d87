//! chat_orchestrator - Conversation orchestration
//!
//! Composes the thread tree, the per-conversation content map, the
//! storage collaborator and the response-streaming collaborator into the
//! operations the application calls: send, regenerate, derive, delete,
//! load, navigate. Tree and decision-vector mutations are synchronous;
//! only collaborator calls suspend.

pub mod coalesce;
pub mod error;
pub mod orchestrator;

pub use coalesce::{ChunkCoalescer, FLUSH_INTERVAL};
pub use error::{OrchestratorError, Result};
pub use orchestrator::{ConversationOrchestrator, DisplayedMessage};
