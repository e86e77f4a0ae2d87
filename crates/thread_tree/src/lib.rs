//! thread_tree - Branching conversation structure
//!
//! A conversation where assistant turns can be regenerated and user turns
//! edited-and-resent is a tree of message ids, not a list. This crate owns
//! that structure (`ThreadTree`, no knowledge of message content) and the
//! pure path-resolution functions that turn a tree plus a per-depth
//! decision vector into the single linear path currently displayed.

pub mod error;
pub mod path;
pub mod tree;

pub use error::{Result, ThreadTreeError};
pub use path::{derive_default_decisions, focus_decisions, resolve_path, PathEntry};
pub use tree::ThreadTree;
