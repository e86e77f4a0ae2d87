//! Storage trait for threaded conversations

use async_trait::async_trait;

use chat_core::{Conversation, Message, Role, ThreadTreeItem};

use crate::error::Result;

/// Persistence contract consumed by the orchestrator.
///
/// Ids are opaque strings minted by the implementation. Adding a message
/// with no parent makes it the conversation's entry (root) message.
#[async_trait]
pub trait ChatStorage: Send + Sync {
    /// Create a conversation, returning its id.
    async fn create_conversation(&self, name: &str, description: Option<&str>) -> Result<String>;

    /// Persist a message under `parent_id` (or as the conversation entry
    /// when `parent_id` is `None`), returning the new message id.
    async fn add_message(
        &self,
        conversation_id: &str,
        text: &str,
        role: Role,
        reasoning: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<String>;

    /// Replace a message's text (and reasoning, when given).
    async fn update_message(
        &self,
        message_id: &str,
        text: &str,
        reasoning: Option<&str>,
    ) -> Result<()>;

    async fn get_message(&self, message_id: &str) -> Result<Message>;

    /// Delete a message. Non-recursive deletion reparents the message's
    /// children to its former parent and returns that parent's id;
    /// deleting a root with more than one child is refused. Recursive
    /// deletion removes the whole subtree and returns `None`.
    async fn delete_message(&self, message_id: &str, recursive: bool) -> Result<Option<String>>;

    /// All messages reachable from the conversation's entry message.
    async fn get_all_messages_involved(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Flat adjacency description of the conversation's thread tree.
    async fn get_thread_tree(&self, conversation_id: &str) -> Result<Vec<ThreadTreeItem>>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn update_conversation(
        &self,
        conversation_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()>;

    /// Delete a conversation together with all messages involved in it.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}
