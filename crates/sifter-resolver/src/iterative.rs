//! Iterative resolver stub.
//!
//! Serving referrals back to clients without following them needs
//! delegation state this server does not keep, so iterative mode
//! answers REFUSED instead of inventing semantics.

use crate::{Lookup, Resolver, Result};
use async_trait::async_trait;
use sifter_proto::{Question, ResponseCode};

/// Iterative resolver: refuses every query.
#[derive(Debug, Default, Clone, Copy)]
pub struct IterativeResolver;

impl IterativeResolver {
    /// Creates the resolver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for IterativeResolver {
    async fn resolve(&self, _question: &Question) -> Result<Lookup> {
        Ok(Lookup {
            rcode: ResponseCode::Refused,
            ..Lookup::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::Name;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_iterative_refuses() {
        let resolver = IterativeResolver::new();
        let question = Question::a(Name::from_str("example.com").unwrap());

        let lookup = resolver.resolve(&question).await.unwrap();
        assert_eq!(lookup.rcode, ResponseCode::Refused);
        assert!(lookup.answers.is_empty());
    }
}
