//! Node store: the arena every file and directory lives in.
//!
//! Nodes are addressed by their [`Inode`] serial number. Links between nodes
//! (`.`, `..`, child entries) are plain inode values, never owning pointers,
//! so the directory graph carries no reference cycles.

use std::collections::BTreeMap;

use derive_more::{Display, From};
use tracing::debug;

/// Name of a directory's self link.
pub const DOT: &str = ".";
/// Name of a directory's parent link.
pub const DOTDOT: &str = "..";

/// Serial number of a node. The first node allocated is 1.
#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Inode(usize);

impl Inode {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FileType {
    #[display("plain file")]
    PlainFile,
    #[display("directory")]
    Directory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainFile {
    words: Vec<String>,
    path: String,
}

impl PlainFile {
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sum of the word lengths, separators not counted.
    pub fn size(&self) -> usize {
        self.words.iter().map(String::len).sum()
    }

    pub(crate) fn replace(&mut self, words: Vec<String>) {
        self.words = words;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: BTreeMap<String, Inode>,
    path: String,
}

impl Directory {
    pub fn entries(&self) -> &BTreeMap<String, Inode> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<Inode> {
        self.entries.get(name).copied()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of entries, `.` and `..` included.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// A directory holding nothing but `.` and `..`.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 2
    }

    pub fn parent(&self) -> Option<Inode> {
        self.get(DOTDOT)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, inode: Inode) {
        self.entries.insert(name.into(), inode);
    }

    pub(crate) fn erase(&mut self, name: &str) -> Option<Inode> {
        self.entries.remove(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContent {
    PlainFile(PlainFile),
    Directory(Directory),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    inode: Inode,
    content: NodeContent,
}

impl Node {
    pub fn inode(&self) -> Inode {
        self.inode
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.content, NodeContent::Directory(_))
    }

    pub fn size(&self) -> usize {
        match &self.content {
            NodeContent::PlainFile(file) => file.size(),
            NodeContent::Directory(dir) => dir.size(),
        }
    }

    pub fn path(&self) -> &str {
        match &self.content {
            NodeContent::PlainFile(file) => file.path(),
            NodeContent::Directory(dir) => dir.path(),
        }
    }

    pub fn as_file(&self) -> Option<&PlainFile> {
        match &self.content {
            NodeContent::PlainFile(file) => Some(file),
            NodeContent::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match &self.content {
            NodeContent::Directory(dir) => Some(dir),
            NodeContent::PlainFile(_) => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut PlainFile> {
        match &mut self.content {
            NodeContent::PlainFile(file) => Some(file),
            NodeContent::Directory(_) => None,
        }
    }

    pub(crate) fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match &mut self.content {
            NodeContent::Directory(dir) => Some(dir),
            NodeContent::PlainFile(_) => None,
        }
    }

    pub(crate) fn set_path(&mut self, path: String) {
        match &mut self.content {
            NodeContent::PlainFile(file) => file.path = path,
            NodeContent::Directory(dir) => dir.path = path,
        }
    }
}

/// Slot arena of nodes. Slot `n - 1` holds the node with inode `n`; a
/// released node leaves an empty slot behind and its number is never handed
/// out again.
#[derive(Debug)]
pub struct NodeStore {
    slots: Vec<Option<Node>>,
    next_inode_nr: usize,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_inode_nr: 1,
        }
    }

    /// Allocates a node of the given kind. A directory starts out with its
    /// `.` entry only; wiring `..` is up to the caller.
    pub fn create(&mut self, kind: FileType) -> Inode {
        let inode = Inode(self.next_inode_nr);
        self.next_inode_nr += 1;

        let content = match kind {
            FileType::PlainFile => NodeContent::PlainFile(PlainFile::default()),
            FileType::Directory => {
                let mut dir = Directory::default();
                dir.insert(DOT, inode);
                NodeContent::Directory(dir)
            }
        };

        debug!("Allocated inode {} of type {}", inode, kind);
        self.slots.push(Some(Node { inode, content }));
        inode
    }

    pub fn identifier(&self, inode: Inode) -> Option<usize> {
        self.get(inode).map(|node| node.inode().get())
    }

    pub fn size(&self, inode: Inode) -> Option<usize> {
        self.get(inode).map(Node::size)
    }

    pub fn get(&self, inode: Inode) -> Option<&Node> {
        inode
            .0
            .checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, inode: Inode) -> Option<&mut Node> {
        inode
            .0
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Frees the slot of `inode`, handing back the node that lived there.
    pub fn release(&mut self, inode: Inode) -> Option<Node> {
        let released = inode
            .0
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::take);
        if released.is_some() {
            debug!("Released inode {}", inode);
        }
        released
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
