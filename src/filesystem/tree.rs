use snafu::{OptionExt, ensure};
use tracing::{debug, info};

use crate::filesystem::error::{
    AlreadyExistsSnafu, DirectoryNotEmptySnafu, FilesystemError, IsADirectorySnafu,
    IsCurrentDirectorySnafu, NotADirectorySnafu, NotAFileSnafu, NotFoundSnafu,
    RefusesToDeleteDotDotOrRootSnafu,
};
use crate::filesystem::listing::{ListingBlock, ListingLine};
use crate::filesystem::node::{DOT, DOTDOT, Directory, FileType, Inode, Node, NodeStore};

/// Name reported for the root when a path has no components at all.
pub const ROOT_NAME: &str = "/";
const DEFAULT_PROMPT: &str = "% ";

pub type Result<T, E = FilesystemError> = std::result::Result<T, E>;

/// The simulated filesystem of one shell session: the node arena, the root,
/// the current directory cursor and the prompt.
///
/// All operations are all-or-nothing. Preconditions are checked before the
/// first entry is touched.
#[derive(Debug)]
pub struct FilesystemTree {
    store: NodeStore,
    root: Inode,
    cwd: Inode,
    prompt: String,
}

impl Default for FilesystemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesystemTree {
    pub fn new() -> Self {
        let mut store = NodeStore::new();
        let root = store.create(FileType::Directory);
        if let Some(node) = store.get_mut(root) {
            node.set_path(ROOT_NAME.to_string());
            if let Some(dir) = node.as_directory_mut() {
                dir.insert(DOTDOT, root);
            }
        }
        debug!("Created filesystem tree with root inode {}", root);

        Self {
            store,
            root,
            cwd: root,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn root(&self) -> Inode {
        self.root
    }

    pub fn cwd(&self) -> Inode {
        self.cwd
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn node(&self, inode: Inode) -> Result<&Node> {
        self.store.get(inode).context(NotFoundSnafu {
            name: format!("inode {inode}"),
        })
    }

    pub fn is_directory(&self, inode: Inode) -> bool {
        self.store.get(inode).is_some_and(Node::is_directory)
    }

    /// Path of the current directory, without the trailing separator.
    pub fn pwd(&self) -> String {
        let path = self.store.get(self.cwd).map(Node::path).unwrap_or(ROOT_NAME);
        ListingBlock::header_for(path)
    }

    /// Walks every component of `path` except the last one and returns the
    /// directory reached together with the last component's name.
    ///
    /// The last component is not checked, so the result serves both for
    /// "where would X be created" and "does X exist". A path without any
    /// component resolves to the root and the name `/`.
    pub fn resolve_parent(&self, path: &str) -> Result<(Inode, String)> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((last, walk)) = components.split_last() else {
            return Ok((self.root, ROOT_NAME.to_string()));
        };

        let mut current = if path.starts_with('/') {
            self.root
        } else {
            self.cwd
        };
        for component in walk {
            let next = self
                .directory(current)?
                .get(component)
                .context(NotFoundSnafu { name: path })?;
            ensure!(self.is_directory(next), NotADirectorySnafu { name: path });
            current = next;
        }

        debug!("Resolved '{}' to parent {} and name '{}'", path, current, last);
        Ok((current, last.to_string()))
    }

    /// Resolves `path` all the way down to an existing node.
    pub fn resolve(&self, path: &str) -> Result<Inode> {
        let (parent, name) = self.resolve_parent(path)?;
        self.lookup(parent, &name)?
            .context(NotFoundSnafu { name: path })
    }

    /// Looks `name` up in directory `parent`. The name `/` always means root.
    pub fn lookup(&self, parent: Inode, name: &str) -> Result<Option<Inode>> {
        if name == ROOT_NAME {
            return Ok(Some(self.root));
        }
        Ok(self.directory(parent)?.get(name))
    }

    pub fn make_directory(&mut self, parent: Inode, name: &str) -> Result<Inode> {
        ensure!(
            self.lookup(parent, name)?.is_none(),
            AlreadyExistsSnafu { name }
        );
        ensure!(!name.is_empty() && !name.contains('/'), NotFoundSnafu { name });

        let path = format!("{}{}/", self.directory(parent)?.path(), name);
        let inode = self.store.create(FileType::Directory);
        let node = self.node_mut(inode)?;
        node.set_path(path);
        if let Some(dir) = node.as_directory_mut() {
            dir.insert(DOTDOT, parent);
        }
        self.directory_mut(parent)?.insert(name, inode);

        debug!("Made directory '{}' as inode {} under {}", name, inode, parent);
        Ok(inode)
    }

    /// Creates the plain file `name` in `parent`, or reuses it when it already
    /// exists, and replaces its content with `words`.
    pub fn make_file(&mut self, parent: Inode, name: &str, words: Vec<String>) -> Result<Inode> {
        let inode = match self.lookup(parent, name)? {
            Some(existing) => {
                ensure!(!self.is_directory(existing), IsADirectorySnafu { name });
                existing
            }
            None => {
                ensure!(!name.is_empty() && !name.contains('/'), NotFoundSnafu { name });
                let path = format!("{}{}", self.directory(parent)?.path(), name);
                let inode = self.store.create(FileType::PlainFile);
                self.node_mut(inode)?.set_path(path);
                self.directory_mut(parent)?.insert(name, inode);
                inode
            }
        };

        self.write(inode, words)?;
        debug!("Made file '{}' as inode {} under {}", name, inode, parent);
        Ok(inode)
    }

    pub fn write(&mut self, inode: Inode, words: Vec<String>) -> Result<()> {
        let node = self.node_mut(inode)?;
        ensure!(!node.is_directory(), NotAFileSnafu { name: node.path() });
        if let Some(file) = node.as_file_mut() {
            file.replace(words);
        }
        Ok(())
    }

    pub fn read(&self, inode: Inode) -> Result<Vec<String>> {
        let node = self.node(inode)?;
        node.as_file()
            .map(|file| file.words().to_vec())
            .context(NotAFileSnafu { name: node.path() })
    }

    /// Removes a plain file or an empty directory.
    pub fn remove(&mut self, parent: Inode, name: &str) -> Result<()> {
        let target = self.removable_target(parent, name)?;
        if let Some(dir) = self.node(target)?.as_directory() {
            ensure!(dir.is_empty(), DirectoryNotEmptySnafu { name });
        }

        self.directory_mut(parent)?.erase(name);
        self.tear_down(target);
        info!("Removed '{}' (inode {}) from {}", name, target, parent);
        Ok(())
    }

    /// Removes `name` and everything below it. Returns the number of nodes
    /// released, the subtree root included.
    pub fn remove_recursive(&mut self, parent: Inode, name: &str) -> Result<usize> {
        let target = self.removable_target(parent, name)?;

        let mut doomed = Vec::new();
        self.collect_post_order(target, &mut doomed);
        for inode in &doomed {
            self.tear_down(*inode);
        }
        self.directory_mut(parent)?.erase(name);

        info!(
            "Recursively removed '{}' from {}: {} nodes",
            name,
            parent,
            doomed.len()
        );
        Ok(doomed.len())
    }

    pub fn list(&self, inode: Inode) -> Result<ListingBlock> {
        let dir = self.directory(inode)?;
        let lines = dir
            .entries()
            .iter()
            .map(|(name, &child)| {
                let node = self.store.get(child);
                ListingLine {
                    inode: child,
                    size: node.map(Node::size).unwrap_or_default(),
                    name: name.clone(),
                    is_directory: node.is_some_and(Node::is_directory),
                }
            })
            .collect();

        Ok(ListingBlock {
            header: ListingBlock::header_for(dir.path()),
            lines,
        })
    }

    /// Pre-order listing of `inode` and every directory below it, produced
    /// lazily one block at a time.
    pub fn list_recursive(&self, inode: Inode) -> Result<RecursiveListing<'_>> {
        self.directory(inode)?;
        Ok(RecursiveListing::new(self, inode))
    }

    /// Moves the cursor. Without a target it goes back to root.
    pub fn change_directory(&mut self, target: Option<Inode>) -> Result<()> {
        let target = target.unwrap_or(self.root);
        self.directory(target)?;
        self.cwd = target;
        debug!("Changed directory to inode {}", target);
        Ok(())
    }

    /// Releases every node, children before their parents and each
    /// directory's `.`/`..` links before the directory itself. Returns the
    /// number of nodes released.
    pub fn teardown(mut self) -> usize {
        let mut doomed = Vec::new();
        self.collect_post_order(self.root, &mut doomed);
        for inode in &doomed {
            self.tear_down(*inode);
        }
        info!("Tore down filesystem tree: {} nodes released", doomed.len());
        doomed.len()
    }

    fn directory(&self, inode: Inode) -> Result<&Directory> {
        let node = self.node(inode)?;
        node.as_directory()
            .context(NotADirectorySnafu { name: node.path() })
    }

    fn directory_mut(&mut self, inode: Inode) -> Result<&mut Directory> {
        self.directory(inode)?;
        self.store
            .get_mut(inode)
            .and_then(Node::as_directory_mut)
            .context(NotFoundSnafu {
                name: format!("inode {inode}"),
            })
    }

    fn node_mut(&mut self, inode: Inode) -> Result<&mut Node> {
        self.store.get_mut(inode).context(NotFoundSnafu {
            name: format!("inode {inode}"),
        })
    }

    /// Shared preconditions of both deletions.
    fn removable_target(&self, parent: Inode, name: &str) -> Result<Inode> {
        ensure!(
            name != DOT && name != DOTDOT && name != ROOT_NAME,
            RefusesToDeleteDotDotOrRootSnafu { name }
        );
        let target = self
            .directory(parent)?
            .get(name)
            .context(NotFoundSnafu { name })?;
        ensure!(target != self.root, RefusesToDeleteDotDotOrRootSnafu { name });
        // The cursor must stay reachable, so its ancestors are protected too.
        ensure!(
            !self.is_ancestor_or_self(target, self.cwd),
            IsCurrentDirectorySnafu { name }
        );
        Ok(target)
    }

    fn is_ancestor_or_self(&self, ancestor: Inode, mut inode: Inode) -> bool {
        loop {
            if inode == ancestor {
                return true;
            }
            match self.directory(inode).ok().and_then(Directory::parent) {
                Some(parent) if parent != inode => inode = parent,
                _ => return false,
            }
        }
    }

    /// Read-only pass collecting `inode` and its descendants, children first.
    fn collect_post_order(&self, inode: Inode, doomed: &mut Vec<Inode>) {
        if let Some(dir) = self.store.get(inode).and_then(Node::as_directory) {
            for (name, &child) in dir.entries() {
                if name != DOT && name != DOTDOT {
                    self.collect_post_order(child, doomed);
                }
            }
        }
        doomed.push(inode);
    }

    /// Empties a directory's entry map (children, then `.` and `..`) and
    /// frees the node.
    fn tear_down(&mut self, inode: Inode) {
        if let Some(dir) = self.store.get_mut(inode).and_then(Node::as_directory_mut) {
            let children: Vec<String> = dir
                .entries()
                .keys()
                .filter(|name| *name != DOT && *name != DOTDOT)
                .cloned()
                .collect();
            for child in children {
                dir.erase(&child);
            }
            dir.erase(DOT);
            dir.erase(DOTDOT);
        }
        self.store.release(inode);
    }
}

/// Iterator behind [`FilesystemTree::list_recursive`]. Calling
/// [`RecursiveListing::restart`] starts the walk over from the top.
#[derive(Debug, Clone)]
pub struct RecursiveListing<'a> {
    tree: &'a FilesystemTree,
    start: Inode,
    pending: Vec<Inode>,
}

impl<'a> RecursiveListing<'a> {
    fn new(tree: &'a FilesystemTree, start: Inode) -> Self {
        Self {
            tree,
            start,
            pending: vec![start],
        }
    }

    pub fn restart(&mut self) {
        self.pending = vec![self.start];
    }
}

impl Iterator for RecursiveListing<'_> {
    type Item = ListingBlock;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let inode = self.pending.pop()?;
            let Ok(block) = self.tree.list(inode) else {
                continue;
            };
            let subdirectories: Vec<Inode> = block
                .lines
                .iter()
                .filter(|line| line.is_directory && line.name != DOT && line.name != DOTDOT)
                .map(|line| line.inode)
                .collect();
            // Reversed so the lexicographically first child is visited next.
            self.pending.extend(subdirectories.into_iter().rev());
            return Some(block);
        }
    }
}
