//! Tree nodes and the record sets they hold.

use compact_str::CompactString;
use hashbrown::HashMap;
use sifter_proto::{Class, ResourceRecord, Type};
use std::time::Instant;

/// Composite key selecting a record set at a node.
///
/// A tuple of the raw class and type codes; unlike an arithmetic
/// combination it cannot collide for any class value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    class: u16,
    rtype: u16,
}

impl RecordKey {
    /// Creates a key from raw class and type codes.
    #[inline]
    pub const fn new(class: u16, rtype: u16) -> Self {
        Self { class, rtype }
    }

    /// Creates a key from typed class and type tags.
    #[inline]
    pub fn from_tags(class: Class, rtype: Type) -> Self {
        Self::new(class.to_u16(), rtype.to_u16())
    }

    /// Creates the key under which a record is stored.
    #[inline]
    pub fn of_record(record: &ResourceRecord) -> Self {
        Self::from_tags(record.rclass(), record.rtype())
    }

    /// Returns the class code.
    #[inline]
    pub const fn class(&self) -> u16 {
        self.class
    }

    /// Returns the type code.
    #[inline]
    pub const fn rtype(&self) -> u16 {
        self.rtype
    }
}

/// A stored record with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct Entry {
    record: ResourceRecord,
    expires_at: Instant,
}

impl Entry {
    /// Creates an entry expiring at `expires_at`.
    #[inline]
    pub fn new(record: ResourceRecord, expires_at: Instant) -> Self {
        Self { record, expires_at }
    }

    /// Returns the stored record.
    #[inline]
    pub fn record(&self) -> &ResourceRecord {
        &self.record
    }

    /// Returns the expiry instant.
    #[inline]
    pub const fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true if the entry expired before `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Returns the whole seconds remaining until expiry, floored at zero.
    pub fn remaining_secs(&self, now: Instant) -> u32 {
        self.expires_at
            .saturating_duration_since(now)
            .as_secs()
            .min(u64::from(u32::MAX)) as u32
    }
}

/// A node of the label tree.
///
/// Holds children keyed by lowercase label and record sets keyed by
/// `(class, type)`. Nodes carry no parent links; every traversal descends
/// from the root.
#[derive(Debug, Default)]
pub struct Node {
    children: HashMap<CompactString, Node>,
    entries: HashMap<RecordKey, Vec<Entry>>,
}

impl Node {
    /// Returns the child for `label`, if present.
    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.get(label)
    }

    /// Returns the child for `label`, creating it if absent.
    pub fn child_or_insert(&mut self, label: CompactString) -> &mut Node {
        self.children.entry(label).or_default()
    }

    /// Iterates over the children.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    /// Returns the record set stored under `key`, if present.
    pub fn records(&self, key: RecordKey) -> Option<&[Entry]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    /// Appends entries, deduplicating against stored records by semantic
    /// equality.
    pub fn add_records(&mut self, entries: Vec<Entry>) {
        for entry in entries {
            let key = RecordKey::of_record(entry.record());
            let set = self.entries.entry(key).or_default();

            if !set.iter().any(|e| e.record().is_same(entry.record())) {
                set.push(entry);
            }
        }
    }

    /// Replaces the record set under `key` with the given entries.
    pub fn set_entries(&mut self, key: RecordKey, entries: Vec<Entry>) {
        self.entries.insert(key, entries);
    }

    /// Removes the record set under `key`, returning it if present.
    pub fn remove_entries(&mut self, key: RecordKey) -> Option<Vec<Entry>> {
        self.entries.remove(&key)
    }
}
