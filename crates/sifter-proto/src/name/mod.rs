//! DNS domain name representation and operations.
//!
//! Names are stored in uncompressed wire format (length-prefixed labels,
//! root-terminated). Comparison and hashing are case-insensitive per
//! RFC 1035, and string conversion always yields the root-terminated
//! ("rootified") form.

mod label;
mod parse;

pub use label::{Label, LabelIter};
pub use parse::NameParser;

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DNS domain name.
///
/// # Wire Format
///
/// A sequence of labels, each prefixed by a length octet, terminated by a
/// zero-length root label. `www.example.com.` is encoded as:
///
/// ```text
/// 03 'w' 'w' 'w' 07 'e' 'x' 'a' 'm' 'p' 'l' 'e' 03 'c' 'o' 'm' 00
/// ```
///
/// Stored names are always uncompressed; compression pointers exist only in
/// serialized messages.
#[derive(Clone)]
pub struct Name {
    /// Uncompressed wire form, inline for typical name sizes.
    wire: SmallVec<[u8; 64]>,
    /// Number of labels including the root label.
    label_count: u8,
}

impl Name {
    /// Creates the root domain name.
    #[inline]
    pub const fn root() -> Self {
        Self {
            wire: SmallVec::new_const(),
            label_count: 1,
        }
    }

    pub(crate) fn from_parts(wire: SmallVec<[u8; 64]>, label_count: u8) -> Self {
        Self { wire, label_count }
    }

    /// Returns the uncompressed wire form.
    ///
    /// The bare root name is represented by an empty slice.
    #[inline]
    pub fn as_wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the wire length including the terminating zero octet.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len().max(1)
    }

    /// Returns the number of labels including the root label.
    #[inline]
    pub const fn label_count(&self) -> usize {
        self.label_count as usize
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.wire.is_empty() || self.wire.as_slice() == [0]
    }

    /// Returns an iterator over labels, leftmost first, root last.
    #[inline]
    pub fn labels(&self) -> LabelIter<'_> {
        LabelIter::new(&self.wire)
    }

    /// Returns the non-root labels ordered from the root downwards.
    ///
    /// `www.example.com.` yields `["com", "example", "www"]`, which is the
    /// descent order of the label tree.
    pub fn labels_from_root(&self) -> SmallVec<[CompactString; 6]> {
        let mut out: SmallVec<[CompactString; 6]> = self
            .labels()
            .filter(|l| !l.is_root())
            .map(|l| l.to_lowercase())
            .collect();
        out.reverse();
        out
    }

    /// Returns a lowercased copy of the name.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        let mut copy = self.clone();
        for byte in copy.wire.iter_mut() {
            byte.make_ascii_lowercase();
        }
        copy
    }

    /// Returns the parent name (drops the leftmost label), or `None` for
    /// the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        let first_len = self.wire[0] as usize;
        let rest = &self.wire[1 + first_len..];
        if rest.is_empty() || rest == [0] {
            return Some(Self::root());
        }

        Some(Self {
            wire: SmallVec::from_slice(rest),
            label_count: self.label_count - 1,
        })
    }

    /// Returns the root-terminated string form.
    pub fn to_rootified_string(&self) -> CompactString {
        let mut result = CompactString::default();

        for label in self.labels() {
            if !label.is_root() {
                result.push_str(label.as_str_lossy().as_ref());
                result.push('.');
            }
        }

        if result.is_empty() {
            result.push('.');
        }

        result
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a name from dotted text form.
    ///
    /// A missing trailing dot is implied. Allowed label octets are ASCII
    /// letters, digits, and `-`; consecutive dots are rejected.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let s = s.strip_suffix('.').unwrap_or(s);

        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut label_count = 0u8;

        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::invalid_name("empty label"));
            }
            if part.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: part.len() });
            }

            for c in part.chars() {
                if !c.is_ascii_alphanumeric() && c != '-' {
                    return Err(Error::invalid_name(format!(
                        "invalid character '{c}' in label \"{part}\""
                    )));
                }
            }

            wire.push(part.len() as u8);
            wire.extend_from_slice(part.as_bytes());
            label_count += 1;
        }

        wire.push(0);
        label_count += 1;

        if wire.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: wire.len() });
        }

        Ok(Self { wire, label_count })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rootified_string())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl PartialEq for Name {
    /// Case-insensitive comparison per DNS semantics.
    fn eq(&self, other: &Self) -> bool {
        if self.label_count != other.label_count {
            return false;
        }

        self.labels()
            .zip(other.labels())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in self.labels() {
            for &byte in label.as_bytes() {
                byte.to_ascii_lowercase().hash(state);
            }
            0xFFu8.hash(state); // label separator
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_rootified_string())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
