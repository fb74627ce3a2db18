//! # Sifter Label Tree
//!
//! A trie keyed by DNS labels, traversed from the root downwards
//! (`www.example.com.` descends `.` → `com` → `example` → `www`). Each
//! node holds record sets keyed by `(class, type)`; entries carry an
//! absolute expiry instant so the same structure backs both the cache
//! (real expiries) and the authoritative store (far-future expiries).
//!
//! The tree itself is not synchronized; its users wrap it in a
//! reader-writer lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod node;

pub use node::{Entry, Node, RecordKey};

use compact_str::CompactString;
use sifter_proto::Name;
use thiserror::Error;

/// Label tree errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// No node exists at the requested name.
    #[error("node not found in tree")]
    NodeNotFound,

    /// The node exists but holds no records for the requested key.
    #[error("no such data")]
    NoSuchData,
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// A trie over DNS labels.
#[derive(Debug, Default)]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Creates an empty tree holding only the root sentinel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks to the node for `name` without creating anything.
    pub fn get(&self, name: &Name) -> Result<&Node> {
        let mut current = &self.root;
        for label in name.labels_from_root() {
            current = current.child(&label).ok_or(TreeError::NodeNotFound)?;
        }
        Ok(current)
    }

    /// Walks to the node for `name`, creating missing nodes along the way,
    /// and returns the leaf.
    pub fn populate(&mut self, name: &Name) -> &mut Node {
        let mut current = &mut self.root;
        for label in name.labels_from_root() {
            current = current.child_or_insert(label);
        }
        current
    }

    /// Returns the records stored for `(name, class, type)`.
    pub fn records(&self, name: &Name, key: RecordKey) -> Result<&[Entry]> {
        let node = self.get(name)?;
        node.records(key).ok_or(TreeError::NoSuchData)
    }

    /// Returns the total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            1 + node.children().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

/// Normalizes a domain string to its rootified form.
///
/// `example.com` becomes `example.com.`; an already rootified name is
/// returned unchanged.
pub fn rootify(name: &str) -> CompactString {
    if name.ends_with('.') {
        CompactString::from(name)
    } else {
        let mut out = CompactString::from(name);
        out.push('.');
        out
    }
}
