use std::fmt;

use crate::filesystem::node::Inode;

/// One entry line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    pub inode: Inode,
    pub size: usize,
    pub name: String,
    pub is_directory: bool,
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_directory { "/" } else { "" };
        write!(
            f,
            "{:>6}  {:>6}  {}{}",
            self.inode.get(),
            self.size,
            self.name,
            marker
        )
    }
}

/// The listing of a single directory: a `path:` header followed by its
/// entries in name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingBlock {
    pub header: String,
    pub lines: Vec<ListingLine>,
}

impl ListingBlock {
    /// Builds the header from a directory's cached path: root stays `/`, any
    /// other path loses its trailing separator.
    pub fn header_for(path: &str) -> String {
        match path {
            "/" | "" => "/".to_string(),
            path => path.strip_suffix('/').unwrap_or(path).to_string(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.name.as_str())
    }
}

impl fmt::Display for ListingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.header)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
