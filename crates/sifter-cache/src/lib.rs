//! # Sifter DNS Cache
//!
//! An in-memory answer cache over the label tree. Entries carry absolute
//! expiry instants derived from record TTLs; lookups report HIT, MISS, or
//! EXPIRED (expired but still inside the stale-serving window) and rewrite
//! TTLs to the remaining lifetime.
//!
//! The tree is wrapped in a reader-writer lock: lookups proceed
//! concurrently, writes are serialized, and the last writer wins for any
//! given `(name, class, type)` key.

#![warn(missing_docs)]
#![warn(clippy::all)]

use hashbrown::HashMap;
use parking_lot::RwLock;
use sifter_proto::{Class, Name, Question, ResourceRecord, Type};
use sifter_tree::{Entry, RecordKey, Tree};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Unexpired records were found.
    Hit,
    /// Nothing usable was found.
    Miss,
    /// Only expired records inside the stale window were found.
    Expired,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// Result of a cache lookup: the usable records (TTLs rewritten to the
/// remaining lifetime) and the lookup status.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// The records found, empty on a miss.
    pub records: Vec<ResourceRecord>,
    /// The lookup status.
    pub status: CacheStatus,
}

impl CacheLookup {
    fn miss() -> Self {
        Self {
            records: Vec::new(),
            status: CacheStatus::Miss,
        }
    }

    /// Returns true if this was a hit.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// Cache hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
}

impl CacheStats {
    /// Returns the number of hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of stale (expired-window) hits.
    pub fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }
}

/// In-memory DNS answer cache.
pub struct Cache {
    tree: RwLock<Tree>,
    max_stale: Duration,
    stats: CacheStats,
}

impl Cache {
    /// Creates a cache serving expired entries for up to `max_stale`
    /// after their natural expiry.
    pub fn new(max_stale: Duration) -> Self {
        Self {
            tree: RwLock::new(Tree::new()),
            max_stale,
            stats: CacheStats::default(),
        }
    }

    /// Returns the stale-serving window.
    #[inline]
    pub fn max_stale(&self) -> Duration {
        self.max_stale
    }

    /// Returns the cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Looks up `(name, class, type)`.
    ///
    /// Returned TTLs are rewritten to `max(0, expiry - now)` so responses
    /// built from the cache carry the remaining lifetime.
    pub fn lookup(&self, name: &Name, class: Class, rtype: Type) -> CacheLookup {
        let key = RecordKey::from_tags(class, rtype);
        let now = Instant::now();

        let tree = self.tree.read();
        let Ok(entries) = tree.records(name, key) else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return CacheLookup::miss();
        };

        let live: Vec<ResourceRecord> = entries
            .iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| e.record().with_ttl(e.remaining_secs(now)))
            .collect();

        if !live.is_empty() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return CacheLookup {
                records: live,
                status: CacheStatus::Hit,
            };
        }

        let stale: Vec<ResourceRecord> = entries
            .iter()
            .filter(|e| e.expires_at() + self.max_stale > now)
            .map(|e| e.record().with_ttl(0))
            .collect();

        if !stale.is_empty() {
            self.stats.stale_hits.fetch_add(1, Ordering::Relaxed);
            return CacheLookup {
                records: stale,
                status: CacheStatus::Expired,
            };
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        CacheLookup::miss()
    }

    /// Looks up a question's `(qname, qclass, qtype)`.
    #[inline]
    pub fn lookup_question(&self, question: &Question) -> CacheLookup {
        self.lookup(&question.qname, question.qclass, question.qtype)
    }

    /// Stores records under `name`, grouped by `(class, type)`.
    ///
    /// Each group replaces whatever the key held before; per-record
    /// expiry derives from the record's TTL at insertion time.
    pub fn set(&self, name: &Name, records: Vec<ResourceRecord>) {
        if records.is_empty() {
            return;
        }

        let now = Instant::now();
        let mut groups: HashMap<RecordKey, Vec<Entry>> = HashMap::new();
        for record in records {
            let key = RecordKey::of_record(&record);
            let expires_at = now + Duration::from_secs(u64::from(record.ttl()));
            groups.entry(key).or_default().push(Entry::new(record, expires_at));
        }

        let mut tree = self.tree.write();
        let node = tree.populate(name);
        for (key, entries) in groups {
            node.set_entries(key, entries);
        }
    }

    /// Stores many records, grouped by their owner names.
    pub fn set_multi(&self, records: Vec<ResourceRecord>) {
        let mut by_name: Vec<(Name, Vec<ResourceRecord>)> = Vec::new();
        for record in records {
            match by_name.iter_mut().find(|(n, _)| n == record.name()) {
                Some((_, group)) => group.push(record),
                None => by_name.push((record.name().clone(), vec![record])),
            }
        }

        for (name, group) in by_name {
            self.set(&name, group);
        }
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("max_stale", &self.max_stale)
            .finish_non_exhaustive()
    }
}
