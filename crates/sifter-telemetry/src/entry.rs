//! Collector entries.

use sifter_proto::{Question, ResourceRecord};
use std::net::IpAddr;
use std::time::Duration;

/// One recorded query.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Sequence number assigned by the collector.
    pub id: u64,
    /// The question that was asked.
    pub question: Question,
    /// The answer records returned.
    pub answers: Vec<ResourceRecord>,
    /// The client's address (possibly anonymized).
    pub client: IpAddr,
    /// Wall-clock time spent handling the query.
    pub elapsed: Duration,
    /// True if a filter rule decided the answer.
    pub filtered: bool,
    /// True if the answer came from the cache.
    pub cached: bool,
}

impl Entry {
    /// Creates an entry for a normally resolved query.
    pub fn new(
        question: Question,
        answers: Vec<ResourceRecord>,
        client: IpAddr,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: 0,
            question,
            answers,
            client,
            elapsed,
            filtered: false,
            cached: false,
        }
    }

    /// Creates an entry for a cache-served query.
    pub fn cached(
        question: Question,
        answers: Vec<ResourceRecord>,
        client: IpAddr,
        elapsed: Duration,
    ) -> Self {
        let mut entry = Self::new(question, answers, client, elapsed);
        entry.cached = true;
        entry
    }

    /// Creates an entry for a filtered query.
    pub fn filtered(
        question: Question,
        answers: Vec<ResourceRecord>,
        client: IpAddr,
        elapsed: Duration,
    ) -> Self {
        let mut entry = Self::new(question, answers, client, elapsed);
        entry.filtered = true;
        entry
    }

    /// Zeroes the host bits of the client address (/24 for IPv4, /48 for
    /// IPv6).
    pub fn anonymize(&mut self) {
        self.client = match self.client {
            IpAddr::V4(v4) => {
                let [a, b, c, _] = v4.octets();
                IpAddr::V4(std::net::Ipv4Addr::new(a, b, c, 0))
            }
            IpAddr::V6(v6) => {
                let s = v6.segments();
                IpAddr::V6(std::net::Ipv6Addr::new(s[0], s[1], s[2], 0, 0, 0, 0, 0))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::Name;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    fn question() -> Question {
        Question::a(Name::from_str("example.com").unwrap())
    }

    #[test]
    fn test_constructors_set_flags() {
        let client = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

        let plain = Entry::new(question(), vec![], client, Duration::from_millis(5));
        assert!(!plain.filtered && !plain.cached);

        let cached = Entry::cached(question(), vec![], client, Duration::from_millis(1));
        assert!(cached.cached && !cached.filtered);

        let filtered = Entry::filtered(question(), vec![], client, Duration::from_millis(1));
        assert!(filtered.filtered && !filtered.cached);
    }

    #[test]
    fn test_anonymize() {
        let mut entry = Entry::new(
            question(),
            vec![],
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 77)),
            Duration::ZERO,
        );
        entry.anonymize();
        assert_eq!(entry.client, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 0)));

        let mut entry6 = Entry::new(
            question(),
            vec![],
            IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0xcafe, 1, 2, 3, 4, 5)),
            Duration::ZERO,
        );
        entry6.anonymize();
        assert_eq!(
            entry6.client,
            IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0xcafe, 0, 0, 0, 0, 0))
        );
    }
}
