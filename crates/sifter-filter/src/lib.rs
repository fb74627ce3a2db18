//! # Sifter DNS Filtering Engine
//!
//! Exact-match domain filtering for the query pipeline. Rules map a
//! normalized (rootified, lowercase) domain name to the IP address to
//! answer with; what a match actually does is controlled by the engine's
//! response mode:
//!
//! | Mode | Behavior |
//! |---|---|
//! | `NXDOMAIN` | RCODE NameError, no answer records |
//! | `LOCALIP`  | One synthesized record carrying the server's address |
//! | `NODATA`   | RCODE NoError, no answer records |
//! | `NULL`     | One synthesized record carrying the rule's address |
//!
//! Rule lists use the hosts-like `[ip] domain` line format; a missing IP
//! defaults to `0.0.0.0`. Lists load from files, and from URLs when the
//! `http` feature is enabled.

#![warn(missing_docs)]
#![warn(clippy::all)]

use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sifter_proto::{Question, RData, RecordType, ResourceRecord};
use sifter_tree::rootify;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Default IP answered for rules that specify none.
const DEFAULT_RULE_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Filtering errors.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The configured response mode string is not recognized.
    #[error("invalid filter mode: {0}")]
    InvalidFilterMode(String),

    /// A rule's IP address failed to parse.
    #[error("invalid ip address in rule: {0}")]
    InvalidIpAddress(String),

    /// A rule line has the wrong shape.
    #[error("invalid domain rule: {0}")]
    InvalidDomainRule(String),

    /// The rule to remove does not exist.
    #[error("no such rule: {0}")]
    NoSuchRule(String),

    /// IO error while reading a rule list.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// HTTP error while fetching a rule list.
    #[cfg(feature = "http")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL loading requested without the `http` feature.
    #[cfg(not(feature = "http"))]
    #[error("http support not enabled, compile with the 'http' feature")]
    HttpNotEnabled,
}

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

/// How the engine answers a filtered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterMode {
    /// Answer NXDOMAIN with no records.
    NxDomain,
    /// Answer with the server's own address.
    LocalIp,
    /// Answer NoError with no records.
    NoData,
    /// Answer with the rule's address (default 0.0.0.0).
    Null,
}

impl FromStr for FilterMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NXDOMAIN" => Ok(Self::NxDomain),
            "LOCALIP" => Ok(Self::LocalIp),
            "NODATA" => Ok(Self::NoData),
            "NULL" => Ok(Self::Null),
            other => Err(FilterError::InvalidFilterMode(other.to_string())),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NxDomain => "NXDOMAIN",
            Self::LocalIp => "LOCALIP",
            Self::NoData => "NODATA",
            Self::Null => "NULL",
        };
        write!(f, "{s}")
    }
}

/// What a matched query should be answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Answer NXDOMAIN with no records.
    NxDomain,
    /// Answer NoError with no records.
    NoData,
    /// Answer NoError with this synthesized record.
    Answer(ResourceRecord),
}

/// The filter engine.
///
/// Rules live in a concurrent map so they can be added and removed while
/// the server answers queries.
pub struct FilterEngine {
    rules: DashMap<CompactString, IpAddr>,
    mode: FilterMode,
    ttl: u32,
    server_address: IpAddr,
}

impl FilterEngine {
    /// Creates an engine with the given response mode, answer TTL, and
    /// server address (used by `LOCALIP` mode).
    pub fn new(mode: FilterMode, ttl: u32, server_address: IpAddr) -> Self {
        Self {
            rules: DashMap::new(),
            mode,
            ttl,
            server_address,
        }
    }

    /// Returns the response mode.
    #[inline]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Returns the number of loaded rules.
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Parses a rule line of the form `[ip] domain`.
    ///
    /// A single field is a bare domain answered with 0.0.0.0; two fields
    /// are an IP and a domain.
    pub fn parse_rule(line: &str) -> Result<(CompactString, IpAddr)> {
        let mut parts = line.split_whitespace();
        let first = parts
            .next()
            .ok_or_else(|| FilterError::InvalidDomainRule(line.to_string()))?;

        match (parts.next(), parts.next()) {
            (None, _) => Ok((normalize(first), DEFAULT_RULE_IP)),
            (Some(domain), None) => {
                let ip: IpAddr = first
                    .parse()
                    .map_err(|_| FilterError::InvalidIpAddress(first.to_string()))?;
                Ok((normalize(domain), ip))
            }
            (Some(_), Some(_)) => Err(FilterError::InvalidDomainRule(line.to_string())),
        }
    }

    /// Adds a rule from its text form.
    pub fn add_rule(&self, line: &str) -> Result<()> {
        let (domain, ip) = Self::parse_rule(line)?;
        self.rules.insert(domain, ip);
        Ok(())
    }

    /// Removes the rule for `domain`.
    pub fn remove_rule(&self, domain: &str) -> Result<()> {
        self.rules
            .remove(normalize(domain).as_str())
            .map(|_| ())
            .ok_or_else(|| FilterError::NoSuchRule(domain.to_string()))
    }

    /// Loads rules from newline-separated text, skipping blank lines and
    /// `#` comments. Returns the number of rules added.
    pub fn load_rules(&self, text: &str) -> Result<usize> {
        let mut added = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.add_rule(line)?;
            added += 1;
        }
        Ok(added)
    }

    /// Loads rules from a file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let added = self.load_rules(&text)?;
        info!(path = %path.as_ref().display(), rules = added, "loaded filter list");
        Ok(added)
    }

    /// Loads rules from a URL.
    #[cfg(feature = "http")]
    pub async fn load_url(&self, url: &str) -> Result<usize> {
        let text = reqwest::get(url).await?.error_for_status()?.text().await?;
        let added = self.load_rules(&text)?;
        info!(url, rules = added, "loaded filter list");
        Ok(added)
    }

    /// Loads rules from a URL (requires the `http` feature).
    #[cfg(not(feature = "http"))]
    pub async fn load_url(&self, _url: &str) -> Result<usize> {
        Err(FilterError::HttpNotEnabled)
    }

    /// Matches a question against the rules.
    ///
    /// Returns the action to answer with, or `None` if no rule matches.
    pub fn matches(&self, question: &Question) -> Option<FilterAction> {
        let key = normalize(&question.qname.to_rootified_string());
        let ip = *self.rules.get(key.as_str())?;

        debug!(domain = %key, mode = %self.mode, "filter rule matched");

        let action = match self.mode {
            FilterMode::NxDomain => FilterAction::NxDomain,
            FilterMode::NoData => FilterAction::NoData,
            FilterMode::LocalIp => self.synthesize(question, self.server_address),
            FilterMode::Null => self.synthesize(question, ip),
        };

        Some(action)
    }

    /// Builds the synthesized answer for address modes.
    ///
    /// An address family that does not fit the query type degrades to
    /// NODATA rather than answering with the wrong record type.
    fn synthesize(&self, question: &Question, ip: IpAddr) -> FilterAction {
        let Some(rtype) = question.record_type() else {
            return FilterAction::NoData;
        };

        let ip = match (rtype, ip) {
            // A 0.0.0.0 rule answering an AAAA query maps to ::.
            (RecordType::AAAA, IpAddr::V4(v4)) if v4.is_unspecified() => {
                IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
            }
            _ => ip,
        };

        match RData::from_ip(rtype, ip) {
            Some(rdata) => FilterAction::Answer(ResourceRecord::from_rdata(
                question.qname.clone(),
                self.ttl,
                rdata,
            )),
            None => FilterAction::NoData,
        }
    }
}

impl fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEngine")
            .field("mode", &self.mode)
            .field("rules", &self.rules.len())
            .finish()
    }
}

fn normalize(domain: &str) -> CompactString {
    rootify(&domain.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::Name;
    use std::net::Ipv6Addr;

    fn engine(mode: FilterMode) -> FilterEngine {
        FilterEngine::new(mode, 300, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)))
    }

    fn a_question(name: &str) -> Question {
        Question::a(Name::from_str(name).unwrap())
    }

    #[test]
    fn test_parse_rule_forms() {
        let (domain, ip) = FilterEngine::parse_rule("ads.example.com").unwrap();
        assert_eq!(domain, "ads.example.com.");
        assert_eq!(ip, DEFAULT_RULE_IP);

        let (domain, ip) = FilterEngine::parse_rule("10.0.0.1 ads.example.com").unwrap();
        assert_eq!(domain, "ads.example.com.");
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        assert!(matches!(
            FilterEngine::parse_rule("bogus ads.example.com"),
            Err(FilterError::InvalidIpAddress(_))
        ));
        assert!(matches!(
            FilterEngine::parse_rule("1.2.3.4 ads.example.com extra"),
            Err(FilterError::InvalidDomainRule(_))
        ));
    }

    #[test]
    fn test_null_mode_answers_rule_ip() {
        let engine = engine(FilterMode::Null);
        engine.add_rule("0.0.0.0 ads.example.com").unwrap();

        let action = engine.matches(&a_question("ads.example.com")).unwrap();
        match action {
            FilterAction::Answer(record) => {
                assert_eq!(record.rdata().as_a(), Some(Ipv4Addr::UNSPECIFIED));
                assert_eq!(record.ttl(), 300);
                assert_eq!(record.name().to_string(), "ads.example.com.");
            }
            other => panic!("expected answer, got {other:?}"),
        }
    }

    #[test]
    fn test_localip_mode_answers_server_ip() {
        let engine = engine(FilterMode::LocalIp);
        engine.add_rule("10.9.9.9 ads.example.com").unwrap();

        let action = engine.matches(&a_question("ads.example.com")).unwrap();
        match action {
            FilterAction::Answer(record) => {
                // LOCALIP ignores the rule IP and answers with the
                // server's address.
                assert_eq!(record.rdata().as_a(), Some(Ipv4Addr::new(192, 168, 1, 1)));
            }
            other => panic!("expected answer, got {other:?}"),
        }
    }

    #[test]
    fn test_nxdomain_and_nodata_modes() {
        let nx = engine(FilterMode::NxDomain);
        nx.add_rule("ads.example.com").unwrap();
        assert_eq!(
            nx.matches(&a_question("ads.example.com")),
            Some(FilterAction::NxDomain)
        );

        let nodata = engine(FilterMode::NoData);
        nodata.add_rule("ads.example.com").unwrap();
        assert_eq!(
            nodata.matches(&a_question("ads.example.com")),
            Some(FilterAction::NoData)
        );
    }

    #[test]
    fn test_aaaa_query_against_v4_rule() {
        let engine = engine(FilterMode::Null);
        engine.add_rule("0.0.0.0 ads.example.com").unwrap();

        let question = Question::aaaa(Name::from_str("ads.example.com").unwrap());
        match engine.matches(&question).unwrap() {
            FilterAction::Answer(record) => {
                assert_eq!(record.rdata().as_aaaa(), Some(Ipv6Addr::UNSPECIFIED));
            }
            other => panic!("expected answer, got {other:?}"),
        }

        // A concrete v4 rule cannot answer an AAAA query.
        engine.add_rule("10.0.0.1 track.example.com").unwrap();
        let question = Question::aaaa(Name::from_str("track.example.com").unwrap());
        assert_eq!(engine.matches(&question), Some(FilterAction::NoData));
    }

    #[test]
    fn test_no_match_passes_through() {
        let engine = engine(FilterMode::Null);
        engine.add_rule("ads.example.com").unwrap();
        assert_eq!(engine.matches(&a_question("example.com")), None);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let engine = engine(FilterMode::NxDomain);
        engine.add_rule("Ads.Example.COM").unwrap();
        assert!(engine.matches(&a_question("ADS.example.com")).is_some());
    }

    #[test]
    fn test_load_rules_skips_comments() {
        let engine = engine(FilterMode::Null);
        let added = engine
            .load_rules("# blocklist\n\n0.0.0.0 a.example.com\nb.example.com\n")
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(engine.rule_count(), 2);
    }

    #[test]
    fn test_remove_rule() {
        let engine = engine(FilterMode::Null);
        engine.add_rule("ads.example.com").unwrap();
        engine.remove_rule("ads.example.com").unwrap();
        assert!(matches!(
            engine.remove_rule("ads.example.com"),
            Err(FilterError::NoSuchRule(_))
        ));
    }
}
