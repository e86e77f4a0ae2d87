//! ThreadTree - parent/child structure over message ids
//!
//! Backed by an arena of node records addressed by integer handles, with
//! an id -> handle lookup table so traversal never rehashes id strings.
//! Each slot carries its parent handle, so parent lookup is O(1).

use std::collections::HashMap;

use chat_core::ThreadTreeItem;

use crate::error::{Result, ThreadTreeError};

#[derive(Debug, Clone)]
struct Slot {
    id: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Adjacency structure for one conversation's message ids.
///
/// Invariants: at most one node has no parent (the root), every non-root
/// id appears in exactly one parent's children list, the structure is
/// acyclic, and a child's position in its parent's list is its permanent
/// branch index (entries are only ever removed, never reordered).
#[derive(Debug, Clone, Default)]
pub struct ThreadTree {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
}

impl ThreadTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tree from the flat description returned by storage.
    pub fn from_items(items: &[ThreadTreeItem]) -> Self {
        let mut tree = Self::new();
        for item in items {
            tree.add_node(&item.key, item.parent.as_deref(), &item.children);
        }
        tree
    }

    /// Insert or update a node. If `parent_id` is given, `id` is appended
    /// to that parent's children only if not already present; the node's
    /// own children list is always (re)set to `children`. Repeated calls
    /// with identical arguments are no-ops.
    pub fn add_node(&mut self, id: &str, parent_id: Option<&str>, children: &[String]) {
        let idx = self.ensure_slot(id);

        if let Some(parent_id) = parent_id {
            let parent_idx = self.ensure_slot(parent_id);
            self.attach(idx, parent_idx);
        }

        // (Re)set the children list, detaching previous children that are
        // no longer listed.
        let new_children: Vec<usize> = children.iter().map(|c| self.ensure_slot(c)).collect();
        let old_children = match &self.slots[idx] {
            Some(slot) => slot.children.clone(),
            None => return,
        };
        for old in old_children {
            if !new_children.contains(&old) {
                if let Some(slot) = self.slots[old].as_mut() {
                    slot.parent = None;
                }
            }
        }
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.children.clear();
        }
        for child_idx in new_children {
            self.attach(child_idx, idx);
        }
    }

    /// Remove a node, splicing its children directly under its former
    /// parent (path compression). Children keep their relative order and
    /// are appended after any existing siblings at the new parent. A
    /// parentless node with more than one child cannot be removed: there
    /// would be no unambiguous new root. Unknown ids are a no-op.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(());
        };
        let (parent, children) = match &self.slots[idx] {
            Some(slot) => (slot.parent, slot.children.clone()),
            None => return Ok(()),
        };

        if parent.is_none() && children.len() > 1 {
            return Err(ThreadTreeError::AmbiguousRoot(id.to_string()));
        }

        if let Some(parent_idx) = parent {
            if let Some(slot) = self.slots[parent_idx].as_mut() {
                slot.children.retain(|&c| c != idx);
            }
        }
        for &child_idx in &children {
            if let Some(slot) = self.slots[child_idx].as_mut() {
                slot.parent = parent;
            }
            if let Some(parent_idx) = parent {
                if let Some(slot) = self.slots[parent_idx].as_mut() {
                    slot.children.push(child_idx);
                }
            }
        }

        self.index.remove(id);
        self.slots[idx] = None;
        self.free.push(idx);
        Ok(())
    }

    /// Reparent a node by removing it and re-adding it under the new
    /// parent. Its previous children splice to its former parent (as in
    /// `remove_node`), so the node comes back as a leaf. Parentless nodes
    /// are left untouched.
    pub fn update_parent_id(&mut self, id: &str, new_parent_id: Option<&str>) -> Result<()> {
        if self.get_parent_id(id).is_none() {
            return Ok(());
        }
        // The node has a parent, so removal cannot hit the ambiguous-root
        // case.
        self.remove_node(id)?;
        self.add_node(id, new_parent_id, &[]);
        Ok(())
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_children(&self, parent_id: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(parent_id) else {
            return Vec::new();
        };
        match &self.slots[idx] {
            Some(slot) => slot
                .children
                .iter()
                .filter_map(|&c| self.slots[c].as_ref().map(|s| s.id.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn get_parent_id(&self, id: &str) -> Option<&str> {
        let &idx = self.index.get(id)?;
        let parent_idx = self.slots[idx].as_ref()?.parent?;
        self.slots[parent_idx].as_ref().map(|s| s.id.as_str())
    }

    /// Depth of a node, with the root at 0. Returns -1 for unknown ids.
    pub fn get_node_depth(&self, id: &str) -> isize {
        let Some(&idx) = self.index.get(id) else {
            return -1;
        };
        let mut depth = 0;
        let mut current = idx;
        while let Some(parent) = self.slots[current].as_ref().and_then(|s| s.parent) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Index of a node within its parent's children list: its permanent
    /// branch index. Returns -1 for the root and for unknown ids.
    pub fn get_node_sibling_order(&self, id: &str) -> isize {
        let Some(&idx) = self.index.get(id) else {
            return -1;
        };
        let Some(parent_idx) = self.slots[idx].as_ref().and_then(|s| s.parent) else {
            return -1;
        };
        match &self.slots[parent_idx] {
            Some(slot) => slot
                .children
                .iter()
                .position(|&c| c == idx)
                .map(|p| p as isize)
                .unwrap_or(-1),
            None => -1,
        }
    }

    /// Number of siblings at a node's level (including the node itself).
    /// The root has no sibling list, so 0 is returned for it.
    pub fn get_node_sibling_number(&self, id: &str) -> usize {
        let Some(&idx) = self.index.get(id) else {
            return 0;
        };
        let Some(parent_idx) = self.slots[idx].as_ref().and_then(|s| s.parent) else {
            return 0;
        };
        match &self.slots[parent_idx] {
            Some(slot) => slot.children.len(),
            None => 0,
        }
    }

    /// The single parentless node, if the tree is non-empty.
    pub fn root(&self) -> Option<&str> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref())
            .find(|s| s.parent.is_none())
            .map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
    }

    fn ensure_slot(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let slot = Slot {
            id: id.to_string(),
            parent: None,
            children: Vec::new(),
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Make `parent_idx` the parent of `idx`, detaching `idx` from any
    /// previous parent. Refused silently when it would create a cycle.
    fn attach(&mut self, idx: usize, parent_idx: usize) {
        if idx == parent_idx || self.is_ancestor(idx, parent_idx) {
            return;
        }
        let old_parent = self.slots[idx].as_ref().and_then(|s| s.parent);
        if old_parent == Some(parent_idx) {
            // Idempotent re-add under the same parent.
        } else {
            self.detach(idx);
        }
        if let Some(slot) = self.slots[parent_idx].as_mut() {
            if !slot.children.contains(&idx) {
                slot.children.push(idx);
            }
        }
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.parent = Some(parent_idx);
        }
    }

    fn detach(&mut self, idx: usize) {
        let Some(parent_idx) = self.slots[idx].as_ref().and_then(|s| s.parent) else {
            return;
        };
        if let Some(slot) = self.slots[parent_idx].as_mut() {
            slot.children.retain(|&c| c != idx);
        }
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.parent = None;
        }
    }

    /// Whether `maybe_ancestor` lies on the parent chain of `node`.
    fn is_ancestor(&self, maybe_ancestor: usize, node: usize) -> bool {
        let mut current = node;
        while let Some(parent) = self.slots[current].as_ref().and_then(|s| s.parent) {
            if parent == maybe_ancestor {
                return true;
            }
            current = parent;
        }
        false
    }
}
