//! Conversation metadata and the flat thread description
//!
//! `ThreadTreeItem` is the storage-layer description of tree shape: one
//! entry per message with its parent and ordered children. The in-memory
//! tree is rebuilt from these on load.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root message of the conversation's thread tree, if any turn exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_message_id: Option<String>,
}

/// Flat adjacency entry returned by storage for one message node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ThreadTreeItem {
    pub key: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl ThreadTreeItem {
    pub fn new(key: impl Into<String>, parent: Option<String>, children: Vec<String>) -> Self {
        Self {
            key: key.into(),
            parent,
            children,
        }
    }
}
