//! # Sifter DNS Resolver
//!
//! Three resolution strategies behind one interface:
//!
//! - [`RecursiveResolver`] walks the delegation chain from the root
//!   hints, following referrals and glue records down to an answer.
//! - [`ForwardingResolver`] hands every lookup to a single configured
//!   upstream.
//! - [`IterativeResolver`] answers REFUSED; passing referrals back to
//!   clients is not implemented.
//!
//! The recursive and forwarding resolvers populate the shared answer
//! cache and serve stale entries (with a background refresh) inside the
//! configured stale window.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod forward;
pub mod hints;
pub mod iterative;
pub mod recursive;

pub use client::DnsClient;
pub use forward::ForwardingResolver;
pub use hints::RootHints;
pub use iterative::IterativeResolver;
pub use recursive::RecursiveResolver;

use async_trait::async_trait;
use sifter_proto::{Question, ResourceRecord, ResponseCode};
use thiserror::Error;

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The upstream answered with neither answers nor referrals.
    #[error("no answer")]
    NoAnswer,

    /// Resolution cannot proceed: no glue and no way to find the next hop.
    #[error("fatal resolver error")]
    Fatal,

    /// An upstream reply carried the wrong header ID.
    #[error("header id mismatch: sent {sent:04x}, received {received:04x}")]
    HeaderIdMismatch {
        /// ID of the query.
        sent: u16,
        /// ID of the reply.
        received: u16,
    },

    /// An upstream exchange exceeded its deadline.
    #[error("upstream timeout")]
    Timeout,

    /// The referral chain exceeded the depth bound.
    #[error("maximum referral depth exceeded")]
    MaxDepth,

    /// Network error talking to an upstream.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// An upstream reply failed to decode.
    #[error("protocol error: {0}")]
    Proto(#[from] sifter_proto::Error),
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// The outcome of a successful lookup: the three response sections plus
/// the response code to relay.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    /// Answer records.
    pub answers: Vec<ResourceRecord>,
    /// Authority records.
    pub authority: Vec<ResourceRecord>,
    /// Additional records.
    pub additional: Vec<ResourceRecord>,
    /// Response code to relay to the client.
    pub rcode: ResponseCode,
    /// True if this lookup was served from the cache.
    pub cached: bool,
}

impl Lookup {
    /// Creates a lookup carrying cached answer records.
    pub fn cached(answers: Vec<ResourceRecord>) -> Self {
        Self {
            answers,
            cached: true,
            ..Self::default()
        }
    }

    /// Creates a lookup from the sections of an upstream response.
    pub fn from_response(response: &sifter_proto::Message) -> Self {
        Self {
            answers: response.answers().to_vec(),
            authority: response.authority().to_vec(),
            additional: response.additional().to_vec(),
            rcode: response.rcode(),
            cached: false,
        }
    }

    /// Returns every record across all three sections.
    pub fn all_records(&self) -> Vec<ResourceRecord> {
        let mut records =
            Vec::with_capacity(self.answers.len() + self.authority.len() + self.additional.len());
        records.extend_from_slice(&self.answers);
        records.extend_from_slice(&self.authority);
        records.extend_from_slice(&self.additional);
        records
    }
}

/// A DNS resolution strategy.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a question, consulting and populating the cache as the
    /// strategy allows.
    async fn resolve(&self, question: &Question) -> Result<Lookup>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::{Message, Name};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn test_lookup_from_response() {
        let name = Name::from_str("example.com").unwrap();
        let mut response = Message::response_from(&Message::query(Question::a(name.clone())));
        response.add_answer(ResourceRecord::a(name, 300, Ipv4Addr::new(192, 0, 2, 1)));

        let lookup = Lookup::from_response(&response);
        assert_eq!(lookup.answers.len(), 1);
        assert_eq!(lookup.rcode, ResponseCode::NoError);
        assert!(!lookup.cached);
        assert_eq!(lookup.all_records().len(), 1);
    }
}
