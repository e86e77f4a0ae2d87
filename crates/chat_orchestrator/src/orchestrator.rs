//! ConversationOrchestrator
//!
//! One orchestrator instance exclusively owns the tree, content map and
//! decision vector for the active conversation. Every mutating operation
//! ends by re-deriving the decision vector and recomputing the displayed
//! path, so the displayed state is never stale. Mutating operations take
//! `&mut self`; that exclusive borrow is what serializes concurrent
//! send/regenerate attempts on one conversation.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;

use chat_core::{ChatMessage, Conversation, Message, Role};
use chat_storage::ChatStorage;
use chat_stream::{ResponseChunk, ResponseProvider, StreamError, StreamOptions};
use thread_tree::{derive_default_decisions, focus_decisions, resolve_path, ThreadTree};

use crate::coalesce::ChunkCoalescer;
use crate::error::{OrchestratorError, Result};

/// One node of the displayed path: message content plus flags telling
/// whether alternate siblings exist before/after it.
#[derive(Debug, Clone)]
pub struct DisplayedMessage {
    pub message: Message,
    pub has_previous: bool,
    pub has_next: bool,
}

pub struct ConversationOrchestrator {
    storage: Arc<dyn ChatStorage>,
    provider: Arc<dyn ResponseProvider>,
    conversation_id: Option<String>,
    root_id: Option<String>,
    tree: ThreadTree,
    messages: HashMap<String, Message>,
    decisions: Vec<usize>,
    displayed: Vec<DisplayedMessage>,
    is_streaming: bool,
}

impl ConversationOrchestrator {
    pub fn new(storage: Arc<dyn ChatStorage>, provider: Arc<dyn ResponseProvider>) -> Self {
        Self {
            storage,
            provider,
            conversation_id: None,
            root_id: None,
            tree: ThreadTree::new(),
            messages: HashMap::new(),
            decisions: Vec::new(),
            displayed: Vec::new(),
            is_streaming: false,
        }
    }

    // ------------------------------------------------------------------
    // Conversation lifecycle
    // ------------------------------------------------------------------

    pub async fn create_conversation(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let id = self.storage.create_conversation(name, description).await?;
        log::info!("[Orchestrator] Conversation created: {id} ({name})");
        Ok(id)
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.storage.list_conversations().await?)
    }

    pub async fn delete_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.storage.delete_conversation(conversation_id).await?;
        if self.conversation_id.as_deref() == Some(conversation_id) {
            self.reset_local_state();
            self.conversation_id = None;
        }
        log::info!("[Orchestrator] Conversation deleted: {conversation_id}");
        Ok(())
    }

    /// Fetch the full content set and flat tree description, rebuild the
    /// in-memory tree from scratch and re-derive decisions, seeding from
    /// any vector left over from the previous session.
    pub async fn load_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let messages = self
            .storage
            .get_all_messages_involved(conversation_id)
            .await?;
        let items = self.storage.get_thread_tree(conversation_id).await?;

        self.messages = messages.into_iter().map(|m| (m.id.clone(), m)).collect();
        self.tree = ThreadTree::from_items(&items);
        self.root_id = items
            .iter()
            .find(|item| item.parent.is_none())
            .map(|item| item.key.clone());
        self.conversation_id = Some(conversation_id.to_string());
        self.recompute_displayed();

        log::info!(
            "[Orchestrator] Conversation loaded: {conversation_id} ({} messages)",
            self.messages.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Message operations
    // ------------------------------------------------------------------

    /// Persist and insert a message. Without an explicit parent the new
    /// message goes under the last node of the currently displayed path.
    pub async fn add_message(
        &mut self,
        role: Role,
        text: &str,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let parent = parent_id.map(str::to_string).or_else(|| self.last_path_node());
        self.add_message_under(role, text, parent).await
    }

    /// Content-only edit of an existing message; tree shape is untouched.
    pub async fn update_message(&mut self, message_id: &str, text: &str) -> Result<()> {
        self.storage.update_message(message_id, text, None).await?;
        if let Some(message) = self.messages.get_mut(message_id) {
            message.text = text.to_string();
        }
        self.recompute_displayed();
        Ok(())
    }

    /// Add a user turn plus a placeholder assistant child and stream the
    /// response into the placeholder.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        let parent = self.last_path_node();
        let user_id = self.add_message_under(Role::User, text, parent).await?;
        let assistant_id = self
            .add_message_under(Role::Assistant, "", Some(user_id))
            .await?;
        self.stream_into(&assistant_id).await?;
        Ok(assistant_id)
    }

    /// Create a fresh assistant sibling under the same parent and stream
    /// into it. The original turn is untouched and stays reachable by
    /// navigation, which is what makes regeneration branch-creating.
    pub async fn regenerate_message(&mut self, message_id: &str) -> Result<String> {
        if !self.tree.has_node(message_id) {
            return Err(OrchestratorError::NotFound(message_id.to_string()));
        }
        let Some(parent) = self.tree.get_parent_id(message_id).map(str::to_string) else {
            return Err(OrchestratorError::InvalidOperation(
                "cannot regenerate the root message".to_string(),
            ));
        };

        let assistant_id = self
            .add_message_under(Role::Assistant, "", Some(parent))
            .await?;
        self.stream_into(&assistant_id).await?;
        Ok(assistant_id)
    }

    /// Edit-and-resend: start a new branch (user turn + assistant turn)
    /// under `message_id`'s parent with the edited text, leaving the
    /// original branch in place.
    pub async fn derive_message(&mut self, message_id: &str, new_text: &str) -> Result<String> {
        if !self.tree.has_node(message_id) {
            return Err(OrchestratorError::NotFound(message_id.to_string()));
        }
        let parent = self.tree.get_parent_id(message_id).map(str::to_string);

        let user_id = self.add_message_under(Role::User, new_text, parent).await?;
        let assistant_id = self
            .add_message_under(Role::Assistant, "", Some(user_id))
            .await?;
        self.stream_into(&assistant_id).await?;
        Ok(assistant_id)
    }

    /// Delete one message; its children are reparented to its former
    /// parent both in storage and in the in-memory tree.
    pub async fn delete_message(&mut self, message_id: &str) -> Result<Option<String>> {
        let new_parent = self.storage.delete_message(message_id, false).await?;
        self.tree.remove_node(message_id)?;
        self.messages.remove(message_id);
        if self.root_id.as_deref() == Some(message_id) {
            self.root_id = self.tree.root().map(str::to_string);
        }
        self.recompute_displayed();
        log::info!("[Orchestrator] Message deleted: {message_id}");
        Ok(new_parent)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Mutate one decision slot (absolute, or relative to its current
    /// value) and re-derive the whole vector so downstream slots stay
    /// valid for the live tree.
    pub fn change_decision(&mut self, index: usize, value: isize, relative: bool) {
        let current = self.decisions.get(index).copied().unwrap_or(0);
        let next = if relative {
            current.saturating_add_signed(value)
        } else {
            value.max(0) as usize
        };
        if self.decisions.len() <= index {
            self.decisions.resize(index + 1, 0);
        }
        self.decisions[index] = next;
        self.recompute_displayed();
    }

    /// Point the decision vector at `message_id` so it lies on the
    /// resolved path. Unknown ids are a no-op.
    pub fn focus_message(&mut self, message_id: &str) {
        let Some(root) = self.root_id.clone() else {
            return;
        };
        self.decisions = focus_decisions(&self.tree, &root, message_id, &self.decisions);
        self.recompute_displayed();
    }

    // ------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------

    pub fn displayed_path(&self) -> &[DisplayedMessage] {
        &self.displayed
    }

    pub fn decisions(&self) -> &[usize] {
        &self.decisions
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.get(message_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn add_message_under(
        &mut self,
        role: Role,
        text: &str,
        parent_id: Option<String>,
    ) -> Result<String> {
        let conversation_id = self
            .conversation_id
            .clone()
            .ok_or(OrchestratorError::NoConversation)?;

        let id = self
            .storage
            .add_message(&conversation_id, text, role, None, parent_id.as_deref())
            .await?;

        self.messages
            .insert(id.clone(), Message::new(id.clone(), role, text));
        self.tree.add_node(&id, parent_id.as_deref(), &[]);
        if parent_id.is_none() {
            // A parentless message is the conversation's new entry.
            self.root_id = Some(id.clone());
        }
        self.focus_message(&id);

        log::debug!("[Orchestrator] Message added: {id} ({role})");
        Ok(id)
    }

    /// Stream a response into `message_id`. The resolved path is the
    /// model context; the placeholder is its focused last node, dropped
    /// on the provider side via `ignore_last_message`. The streaming flag
    /// is cleared and a final recompute runs on every exit path.
    async fn stream_into(&mut self, message_id: &str) -> Result<()> {
        let context: Vec<ChatMessage> = self
            .displayed
            .iter()
            .map(|d| ChatMessage::from(&d.message))
            .collect();
        let options = StreamOptions {
            ignore_last_message: true,
            insert_guidance: None,
        };

        self.is_streaming = true;
        let outcome = self.consume_stream(message_id, &context, options).await;
        self.is_streaming = false;
        self.recompute_displayed();
        outcome
    }

    async fn consume_stream(
        &mut self,
        message_id: &str,
        context: &[ChatMessage],
        options: StreamOptions,
    ) -> Result<()> {
        let provider = Arc::clone(&self.provider);
        let mut stream = provider.stream_response(context, options).await?;

        let mut text = String::new();
        let mut reasoning = String::new();
        let mut coalescer = ChunkCoalescer::default();
        let mut failure: Option<StreamError> = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(ResponseChunk::Content(chunk)) => {
                    text.push_str(&chunk);
                    if coalescer.tick() {
                        self.apply_stream_text(message_id, &text, &reasoning);
                    }
                }
                Ok(ResponseChunk::Reasoning(chunk)) => {
                    reasoning.push_str(&chunk);
                    if coalescer.tick() {
                        self.apply_stream_text(message_id, &text, &reasoning);
                    }
                }
                Ok(ResponseChunk::Done) => {
                    log::debug!("[Orchestrator] Stream completed: {message_id}");
                    break;
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        drop(stream);

        // The final application is always the fully-accumulated text,
        // whatever the coalescer skipped.
        self.apply_stream_text(message_id, &text, &reasoning);

        if let Some(error) = failure {
            log::error!("[Orchestrator] Stream failed for {message_id}: {error}");
            return Err(error.into());
        }

        let reasoning_final = (!reasoning.is_empty()).then_some(reasoning.as_str());
        self.storage
            .update_message(message_id, &text, reasoning_final)
            .await?;
        Ok(())
    }

    /// Streaming mutates message content only, never tree shape.
    fn apply_stream_text(&mut self, message_id: &str, text: &str, reasoning: &str) {
        if let Some(message) = self.messages.get_mut(message_id) {
            message.text = text.to_string();
            message.reasoning = (!reasoning.is_empty()).then(|| reasoning.to_string());
        }
        self.recompute_displayed();
    }

    /// Re-derive the decision vector against the live tree and rebuild the
    /// displayed sequence. Pure given the current state: re-running it
    /// without an intervening mutation yields the same output. Entries
    /// whose content is momentarily missing are skipped rather than
    /// failing the whole recomputation.
    fn recompute_displayed(&mut self) {
        let Some(root) = self.root_id.clone() else {
            self.decisions.clear();
            self.displayed.clear();
            return;
        };
        self.decisions = derive_default_decisions(&self.tree, &root, &self.decisions);
        self.displayed = resolve_path(&self.tree, &root, &self.decisions)
            .into_iter()
            .filter_map(|entry| {
                self.messages.get(&entry.id).map(|message| DisplayedMessage {
                    message: message.clone(),
                    has_previous: entry.has_previous,
                    has_next: entry.has_next,
                })
            })
            .collect();
    }

    fn last_path_node(&self) -> Option<String> {
        self.displayed.last().map(|d| d.message.id.clone())
    }

    fn reset_local_state(&mut self) {
        self.tree.clear();
        self.messages.clear();
        self.decisions.clear();
        self.displayed.clear();
        self.root_id = None;
    }
}
