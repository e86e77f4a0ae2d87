//! chat_storage - Persistence contract for conversations and messages
//!
//! The orchestration layer only depends on the `ChatStorage` trait; what
//! sits behind it (a database, files, a remote service) is a black box.
//! `MemoryStore` is the in-process adapter used by tests and demos.

pub mod error;
pub mod memory;
pub mod storage;

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use storage::ChatStorage;
