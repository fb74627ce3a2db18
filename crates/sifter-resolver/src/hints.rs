//! Root server hints.

use parking_lot::Mutex;
use std::io;
use std::net::IpAddr;
use std::path::Path;

/// IANA root server IPv4 addresses, the built-in fallback hint set.
const BUILTIN_HINTS: &[&str] = &[
    "198.41.0.4",     // a.root-servers.net
    "199.9.14.201",   // b.root-servers.net
    "192.33.4.12",    // c.root-servers.net
    "199.7.91.13",    // d.root-servers.net
    "192.203.230.10", // e.root-servers.net
    "192.5.5.241",    // f.root-servers.net
    "192.112.36.4",   // g.root-servers.net
    "198.97.190.53",  // h.root-servers.net
    "192.36.148.17",  // i.root-servers.net
    "192.58.128.30",  // j.root-servers.net
    "193.0.14.129",   // k.root-servers.net
    "199.7.83.42",    // l.root-servers.net
    "202.12.27.33",   // m.root-servers.net
];

/// Seed addresses for recursive resolution, rotated round-robin.
///
/// The rotation index is guarded by a mutex so concurrent resolutions
/// spread their priming queries across the root servers.
#[derive(Debug)]
pub struct RootHints {
    addrs: Vec<IpAddr>,
    index: Mutex<usize>,
}

impl RootHints {
    /// Creates hints from an explicit address list.
    ///
    /// Falls back to the built-in set when `addrs` is empty.
    pub fn new(addrs: Vec<IpAddr>) -> Self {
        if addrs.is_empty() {
            return Self::builtin();
        }
        Self {
            addrs,
            index: Mutex::new(0),
        }
    }

    /// Creates the built-in IANA hint set.
    pub fn builtin() -> Self {
        let addrs = BUILTIN_HINTS
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        Self {
            addrs,
            index: Mutex::new(0),
        }
    }

    /// Loads hints from a BIND-style hint file.
    ///
    /// Every address-bearing line contributes its last field; lines that
    /// do not end in an IP address (names, comments, TTLs) are skipped.
    /// Falls back to the built-in set when the file yields nothing.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;

        let addrs: Vec<IpAddr> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with(';'))
            .filter_map(|l| l.split_whitespace().last())
            .filter_map(|field| field.parse().ok())
            .collect();

        Ok(Self::new(addrs))
    }

    /// Returns the number of hint addresses.
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Returns true if no hints are loaded.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Returns the next hint, rotating the shared index atomically.
    pub fn next(&self) -> IpAddr {
        let mut index = self.index.lock();
        *index = (*index + 1) % self.addrs.len();
        self.addrs[*index]
    }
}

impl Default for RootHints {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_builtin_hints() {
        let hints = RootHints::builtin();
        assert_eq!(hints.len(), 13);
    }

    #[test]
    fn test_rotation_wraps() {
        let hints = RootHints::new(vec![
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        ]);

        let first = hints.next();
        let second = hints.next();
        let third = hints.next();

        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_empty_falls_back_to_builtin() {
        let hints = RootHints::new(Vec::new());
        assert_eq!(hints.len(), 13);
    }

    #[test]
    fn test_hint_file_parsing() {
        let dir = std::env::temp_dir().join("sifter-hint-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("named.root");
        std::fs::write(
            &path,
            "; root hints\n.                        3600000      NS    A.ROOT-SERVERS.NET.\nA.ROOT-SERVERS.NET.      3600000      A     198.41.0.4\nA.ROOT-SERVERS.NET.      3600000      AAAA  2001:503:ba3e::2:30\n",
        )
        .unwrap();

        let hints = RootHints::from_file(&path).unwrap();
        assert_eq!(hints.len(), 2);

        std::fs::remove_file(path).ok();
    }
}
