//! In-memory storage adapter
//!
//! Backs the full `ChatStorage` contract with plain maps behind a tokio
//! `RwLock`. Thread relations live in a parent map plus an ordered
//! children map, mirroring the relational adjacency the contract assumes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use chat_core::{Conversation, Message, Role, ThreadTreeItem};

use crate::error::{Result, StorageError};
use crate::storage::ChatStorage;

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Message>,
    parents: HashMap<String, Option<String>>,
    children: HashMap<String, Vec<String>>,
}

impl Inner {
    fn conversation_mut(&mut self, id: &str) -> Result<&mut Conversation> {
        self.conversations
            .get_mut(id)
            .ok_or_else(|| StorageError::ConversationNotFound(id.to_string()))
    }

    fn conversation_by_entry_mut(&mut self, message_id: &str) -> Option<&mut Conversation> {
        self.conversations
            .values_mut()
            .find(|c| c.entry_message_id.as_deref() == Some(message_id))
    }

    /// Level-order collection of a subtree's ids, excluding `root` itself.
    fn descendants(&self, root: &str) -> Vec<String> {
        let mut collected = Vec::new();
        let mut level = vec![root.to_string()];
        while !level.is_empty() {
            let mut next = Vec::new();
            for parent in &level {
                if let Some(children) = self.children.get(parent) {
                    next.extend(children.iter().cloned());
                }
            }
            collected.extend(next.iter().cloned());
            level = next;
        }
        collected
    }

    fn remove_message_records(&mut self, id: &str) {
        self.messages.remove(id);
        self.parents.remove(id);
        self.children.remove(id);
    }
}

/// In-process `ChatStorage` implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStorage for MemoryStore {
    async fn create_conversation(&self, name: &str, description: Option<&str>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conversation = Conversation {
            id: id.clone(),
            name: name.to_string(),
            description: description.map(str::to_string),
            entry_message_id: None,
        };
        self.inner
            .write()
            .await
            .conversations
            .insert(id.clone(), conversation);
        Ok(id)
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        text: &str,
        role: Role,
        reasoning: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let mut inner = self.inner.write().await;
        if !inner.conversations.contains_key(conversation_id) {
            return Err(StorageError::ConversationNotFound(
                conversation_id.to_string(),
            ));
        }
        if let Some(parent) = parent_id {
            if !inner.messages.contains_key(parent) {
                return Err(StorageError::MessageNotFound(parent.to_string()));
            }
        }

        let id = Uuid::new_v4().to_string();
        let mut message = Message::new(id.clone(), role, text);
        message.reasoning = reasoning.map(str::to_string);
        inner.messages.insert(id.clone(), message);
        inner
            .parents
            .insert(id.clone(), parent_id.map(str::to_string));
        inner.children.insert(id.clone(), Vec::new());

        match parent_id {
            Some(parent) => {
                inner
                    .children
                    .entry(parent.to_string())
                    .or_default()
                    .push(id.clone());
            }
            None => {
                // A parentless message becomes the conversation entry.
                inner.conversation_mut(conversation_id)?.entry_message_id = Some(id.clone());
            }
        }
        Ok(id)
    }

    async fn update_message(
        &self,
        message_id: &str,
        text: &str,
        reasoning: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let message = inner
            .messages
            .get_mut(message_id)
            .ok_or_else(|| StorageError::MessageNotFound(message_id.to_string()))?;
        message.text = text.to_string();
        if let Some(reasoning) = reasoning {
            message.reasoning = Some(reasoning.to_string());
        }
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.inner
            .read()
            .await
            .messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| StorageError::MessageNotFound(message_id.to_string()))
    }

    async fn delete_message(&self, message_id: &str, recursive: bool) -> Result<Option<String>> {
        let mut inner = self.inner.write().await;
        if !inner.messages.contains_key(message_id) {
            return Err(StorageError::MessageNotFound(message_id.to_string()));
        }
        let parent = inner.parents.get(message_id).cloned().flatten();

        if recursive {
            for descendant in inner.descendants(message_id) {
                inner.remove_message_records(&descendant);
            }
            match &parent {
                Some(parent) => {
                    if let Some(siblings) = inner.children.get_mut(parent) {
                        siblings.retain(|c| c != message_id);
                    }
                }
                None => {
                    if let Some(conversation) = inner.conversation_by_entry_mut(message_id) {
                        conversation.entry_message_id = None;
                    }
                }
            }
            inner.remove_message_records(message_id);
            return Ok(None);
        }

        let children = inner.children.get(message_id).cloned().unwrap_or_default();
        match &parent {
            Some(parent) => {
                if let Some(siblings) = inner.children.get_mut(parent) {
                    siblings.retain(|c| c != message_id);
                    siblings.extend(children.iter().cloned());
                }
                for child in &children {
                    inner.parents.insert(child.clone(), Some(parent.clone()));
                }
            }
            None => match children.len() {
                0 => {
                    if let Some(conversation) = inner.conversation_by_entry_mut(message_id) {
                        conversation.entry_message_id = None;
                    }
                }
                1 => {
                    let new_root = children[0].clone();
                    inner.parents.insert(new_root.clone(), None);
                    if let Some(conversation) = inner.conversation_by_entry_mut(message_id) {
                        conversation.entry_message_id = Some(new_root);
                    }
                }
                _ => {
                    return Err(StorageError::InvalidOperation(
                        "cannot delete root message with children".to_string(),
                    ));
                }
            },
        }

        inner.remove_message_records(message_id);
        Ok(parent)
    }

    async fn get_all_messages_involved(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        let conversation = inner
            .conversations
            .get(conversation_id)
            .ok_or_else(|| StorageError::ConversationNotFound(conversation_id.to_string()))?;
        let Some(entry) = conversation.entry_message_id.clone() else {
            return Ok(Vec::new());
        };

        let mut messages = vec![inner
            .messages
            .get(&entry)
            .cloned()
            .ok_or_else(|| StorageError::MessageNotFound(entry.clone()))?];
        for id in inner.descendants(&entry) {
            let message = inner
                .messages
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::MessageNotFound(id.clone()))?;
            messages.push(message);
        }
        Ok(messages)
    }

    async fn get_thread_tree(&self, conversation_id: &str) -> Result<Vec<ThreadTreeItem>> {
        let inner = self.inner.read().await;
        let conversation = inner
            .conversations
            .get(conversation_id)
            .ok_or_else(|| StorageError::ConversationNotFound(conversation_id.to_string()))?;
        let Some(entry) = conversation.entry_message_id.clone() else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        let mut stack = vec![entry];
        while let Some(id) = stack.pop() {
            let children = inner.children.get(&id).cloned().unwrap_or_default();
            let parent = inner.parents.get(&id).cloned().flatten();
            items.push(ThreadTreeItem::new(id.as_str(), parent, children.clone()));
            stack.extend(children);
        }
        Ok(items)
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .inner
            .read()
            .await
            .conversations
            .values()
            .cloned()
            .collect())
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let conversation = inner.conversation_mut(conversation_id)?;
        conversation.name = name.to_string();
        conversation.description = description.map(str::to_string);
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .remove(conversation_id)
            .ok_or_else(|| StorageError::ConversationNotFound(conversation_id.to_string()))?;
        if let Some(entry) = conversation.entry_message_id {
            for id in inner.descendants(&entry) {
                inner.remove_message_records(&id);
            }
            inner.remove_message_records(&entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, String, String, String) {
        let store = MemoryStore::new();
        let conversation = store.create_conversation("test", None).await.unwrap();
        let root = store
            .add_message(&conversation, "hi", Role::User, None, None)
            .await
            .unwrap();
        let reply = store
            .add_message(&conversation, "hello", Role::Assistant, None, Some(&root))
            .await
            .unwrap();
        (store, conversation, root, reply)
    }

    #[tokio::test]
    async fn first_message_becomes_entry() {
        let (store, conversation, root, _) = seeded().await;
        let listed = store.list_conversations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entry_message_id.as_deref(), Some(root.as_str()));
        assert_eq!(listed[0].id, conversation);
    }

    #[tokio::test]
    async fn add_message_rejects_unknown_parent() {
        let (store, conversation, _, _) = seeded().await;
        let err = store
            .add_message(&conversation, "x", Role::User, None, Some("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MessageNotFound(_)));
    }

    #[tokio::test]
    async fn thread_tree_lists_every_node_with_parents() {
        let (store, conversation, root, reply) = seeded().await;
        let items = store.get_thread_tree(&conversation).await.unwrap();
        assert_eq!(items.len(), 2);

        let root_item = items.iter().find(|i| i.key == root).unwrap();
        assert_eq!(root_item.parent, None);
        assert_eq!(root_item.children, vec![reply.clone()]);

        let reply_item = items.iter().find(|i| i.key == reply).unwrap();
        assert_eq!(reply_item.parent.as_deref(), Some(root.as_str()));
        assert!(reply_item.children.is_empty());
    }

    #[tokio::test]
    async fn non_recursive_delete_reparents_children() {
        let (store, conversation, root, reply) = seeded().await;
        let leaf = store
            .add_message(&conversation, "more", Role::User, None, Some(&reply))
            .await
            .unwrap();

        let new_parent = store.delete_message(&reply, false).await.unwrap();
        assert_eq!(new_parent.as_deref(), Some(root.as_str()));

        let items = store.get_thread_tree(&conversation).await.unwrap();
        let root_item = items.iter().find(|i| i.key == root).unwrap();
        assert_eq!(root_item.children, vec![leaf]);
    }

    #[tokio::test]
    async fn deleting_single_child_root_promotes_entry() {
        let (store, conversation, root, reply) = seeded().await;
        let new_parent = store.delete_message(&root, false).await.unwrap();
        assert_eq!(new_parent, None);

        let listed = store.list_conversations().await.unwrap();
        assert_eq!(listed[0].entry_message_id.as_deref(), Some(reply.as_str()));
        let items = store.get_thread_tree(&conversation).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].parent, None);
    }

    #[tokio::test]
    async fn deleting_multi_child_root_is_refused() {
        let (store, conversation, root, _) = seeded().await;
        store
            .add_message(&conversation, "variant", Role::Assistant, None, Some(&root))
            .await
            .unwrap();

        let err = store.delete_message(&root, false).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidOperation(_)));
        // Entry untouched.
        let listed = store.list_conversations().await.unwrap();
        assert_eq!(listed[0].entry_message_id.as_deref(), Some(root.as_str()));
    }

    #[tokio::test]
    async fn recursive_delete_removes_the_subtree() {
        let (store, conversation, root, reply) = seeded().await;
        store
            .add_message(&conversation, "deep", Role::User, None, Some(&reply))
            .await
            .unwrap();

        let result = store.delete_message(&reply, true).await.unwrap();
        assert_eq!(result, None);

        let messages = store.get_all_messages_involved(&conversation).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, root);
    }

    #[tokio::test]
    async fn update_message_replaces_text_and_keeps_reasoning() {
        let (store, _, root, _) = seeded().await;
        store
            .update_message(&root, "edited", Some("thought"))
            .await
            .unwrap();
        store.update_message(&root, "edited again", None).await.unwrap();

        let message = store.get_message(&root).await.unwrap();
        assert_eq!(message.text, "edited again");
        assert_eq!(message.reasoning.as_deref(), Some("thought"));
    }

    #[tokio::test]
    async fn delete_conversation_drops_involved_messages() {
        let (store, conversation, root, reply) = seeded().await;
        store.delete_conversation(&conversation).await.unwrap();

        assert!(store.get_message(&root).await.is_err());
        assert!(store.get_message(&reply).await.is_err());
        assert!(store.list_conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_involved_walks_level_order_from_entry() {
        let (store, conversation, root, reply) = seeded().await;
        let variant = store
            .add_message(&conversation, "variant", Role::Assistant, None, Some(&root))
            .await
            .unwrap();

        let messages = store.get_all_messages_involved(&conversation).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![root.as_str(), reply.as_str(), variant.as_str()]);
    }
}
