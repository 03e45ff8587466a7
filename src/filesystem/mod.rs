//! In-memory filesystem tree.
//!
//! Nodes (plain files holding words, and directories) live in a
//! [`NodeStore`] arena and are linked by inode number. [`FilesystemTree`]
//! layers path resolution, the current directory cursor, and the structural
//! operations on top of it.

mod error;
mod listing;
mod node;
mod tree;

pub use error::FilesystemError;
pub use listing::{ListingBlock, ListingLine};
pub use node::{DOT, DOTDOT, Directory, FileType, Inode, Node, NodeContent, NodeStore, PlainFile};
pub use tree::{FilesystemTree, ROOT_NAME, RecursiveListing};
