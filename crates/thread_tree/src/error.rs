//! Thread tree error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThreadTreeError {
    /// Removing a parentless node with more than one child would leave no
    /// unambiguous new root, so the operation is refused.
    #[error("cannot remove root node {0} with multiple children")]
    AmbiguousRoot(String),
}

pub type Result<T> = std::result::Result<T, ThreadTreeError>;
