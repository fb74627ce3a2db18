//! # Sifter Record Store
//!
//! The authoritative record store: local records served before any
//! resolver is consulted. Backed by the same label tree as the cache, but
//! entries are static; they are given a far-future expiry and never age
//! out.
//!
//! A store can be anything behind the [`RecordStore`] trait (a file, a
//! database); the default implementation keeps everything in memory, so
//! it needs no cache in front of it.

#![warn(missing_docs)]
#![warn(clippy::all)]

use parking_lot::RwLock;
use sifter_proto::{Name, Question, ResourceRecord};
use sifter_tree::{Entry, RecordKey, Tree, TreeError};
use std::time::{Duration, Instant};

pub use sifter_tree::Result;

/// Roughly thirty years; static entries never expire in practice.
const STATIC_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Interface for authoritative record lookup and insertion.
pub trait RecordStore: Send + Sync {
    /// Returns the records answering `question`, or an error when the
    /// name or key is absent.
    fn get(&self, question: &Question) -> Result<Vec<ResourceRecord>>;

    /// Stores records under `name`.
    fn set(&self, name: &Name, records: Vec<ResourceRecord>);

    /// Returns true if this store keeps its data behind a separate cache.
    ///
    /// The in-memory store returns false: it already is memory-resident.
    fn uses_cache(&self) -> bool {
        false
    }
}

/// In-memory record store over the label tree.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RwLock<Tree>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, question: &Question) -> Result<Vec<ResourceRecord>> {
        let key = RecordKey::from_tags(question.qclass, question.qtype);
        let tree = self.tree.read();
        let entries = tree.records(&question.qname, key)?;

        if entries.is_empty() {
            return Err(TreeError::NoSuchData);
        }

        Ok(entries.iter().map(|e| e.record().clone()).collect())
    }

    fn set(&self, name: &Name, records: Vec<ResourceRecord>) {
        let expires_at = Instant::now() + STATIC_LIFETIME;
        let entries: Vec<Entry> = records
            .into_iter()
            .map(|r| Entry::new(r, expires_at))
            .collect();

        let mut tree = self.tree.write();
        tree.populate(name).add_records(entries);
    }
}
