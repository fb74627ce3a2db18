//! Recursive resolver.
//!
//! Resolves queries by walking the delegation chain: start at a root
//! hint, follow referrals (NS records in the authority section) using
//! glue addresses from the additional section, and stop on the first
//! response that carries answers or an SOA (a negative answer). When a
//! referral has no usable glue, the nameserver's own address is resolved
//! recursively.

use crate::client::DnsClient;
use crate::hints::RootHints;
use crate::{Lookup, Resolver, ResolverError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use sifter_cache::{Cache, CacheStatus};
use sifter_proto::{Message, Name, Question, RecordType, ResourceRecord};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Bound on referral hops and nested glue resolutions combined.
const MAX_DEPTH: u8 = 16;

/// Recursive DNS resolver.
#[derive(Clone)]
pub struct RecursiveResolver {
    inner: Arc<Inner>,
}

struct Inner {
    client: DnsClient,
    hints: RootHints,
    cache: Option<Arc<Cache>>,
}

impl RecursiveResolver {
    /// Creates a resolver starting from the built-in root hints.
    pub fn new(cache: Option<Arc<Cache>>) -> Self {
        Self::with_hints(RootHints::builtin(), cache)
    }

    /// Creates a resolver with an explicit hint set.
    pub fn with_hints(hints: RootHints, cache: Option<Arc<Cache>>) -> Self {
        Self::with_client(DnsClient::new(), hints, cache)
    }

    /// Creates a resolver with an explicit client (custom timeouts or a
    /// non-standard upstream port).
    pub fn with_client(client: DnsClient, hints: RootHints, cache: Option<Arc<Cache>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                hints,
                cache,
            }),
        }
    }
}

#[async_trait]
impl Resolver for RecursiveResolver {
    async fn resolve(&self, question: &Question) -> Result<Lookup> {
        if let Some(cache) = &self.inner.cache {
            let cached = cache.lookup_question(question);
            match cached.status {
                CacheStatus::Hit => {
                    trace!(question = %question, "cache hit");
                    return Ok(Lookup::cached(cached.records));
                }
                CacheStatus::Expired => {
                    // Serve the stale records and refresh off the request
                    // path; the walk overwrites the cache on completion.
                    trace!(question = %question, "serving stale, refreshing");
                    let inner = self.inner.clone();
                    let refresh = question.clone();
                    tokio::spawn(async move {
                        if let Err(e) = inner.walk(refresh, 0).await {
                            debug!(error = %e, "background refresh failed");
                        }
                    });
                    return Ok(Lookup::cached(cached.records));
                }
                CacheStatus::Miss => {}
            }
        }

        self.inner.clone().walk(question.clone(), 0).await
    }
}

impl Inner {
    /// The referral walk. Boxed because glue fallback recurses.
    fn walk(self: Arc<Self>, question: Question, depth: u8) -> BoxFuture<'static, Result<Lookup>> {
        async move {
            if depth >= MAX_DEPTH {
                warn!(question = %question, "referral depth exceeded");
                return Err(ResolverError::MaxDepth);
            }

            let mut server = self.hints.next();
            let mut hops = 0u8;

            loop {
                if hops >= MAX_DEPTH {
                    return Err(ResolverError::MaxDepth);
                }

                trace!(question = %question, %server, hops, "querying nameserver");
                let response = self.client.query(question.clone(), server).await?;

                // Answered.
                if !response.answers().is_empty() {
                    let lookup = Lookup::from_response(&response);
                    self.cache_records(&lookup);
                    return Ok(lookup);
                }

                // Dead end: neither answers nor referrals.
                if response.authority().is_empty() {
                    return Err(ResolverError::NoAnswer);
                }

                // An SOA in authority is a negative answer; stop here.
                if response.has_soa_authority() {
                    return Ok(Lookup::from_response(&response));
                }

                server = self.clone().find_glue(&response, &question, depth).await?;
                hops += 1;
            }
        }
        .boxed()
    }

    /// Picks the next-hop address for a referral.
    ///
    /// Scans the additional section for a glue record owned by one of the
    /// authority NS names; failing that, resolves the first resolvable NS
    /// name recursively. Matched glue is cached under the nameserver's
    /// own name.
    async fn find_glue(
        self: Arc<Self>,
        response: &Message,
        question: &Question,
        depth: u8,
    ) -> Result<IpAddr> {
        let glue_type = if question.record_type() == Some(RecordType::AAAA) {
            RecordType::AAAA
        } else {
            RecordType::A
        };

        let ns_names: Vec<Name> = response
            .authority()
            .iter()
            .filter_map(|r| r.rdata().as_ns().cloned())
            .collect();

        for ns_name in &ns_names {
            let glue: Vec<&ResourceRecord> = response
                .additional()
                .iter()
                .filter(|ar| ar.record_type() == Some(glue_type) && ar.name() == ns_name)
                .collect();

            if let Some(ip) = glue.iter().find_map(|ar| ar.rdata().as_ip()) {
                trace!(ns = %ns_name, %ip, "following glue");

                if let Some(cache) = &self.cache {
                    cache.set(ns_name, glue.into_iter().cloned().collect());
                }

                return Ok(ip);
            }
        }

        // No glue matched: chase a nameserver address ourselves.
        for ns_name in &ns_names {
            trace!(ns = %ns_name, "no glue, resolving nameserver");
            match self
                .clone()
                .walk(Question::a(ns_name.clone()), depth + 1)
                .await
            {
                Ok(lookup) => {
                    if let Some(ip) = lookup.answers.iter().find_map(|r| r.rdata().as_ip()) {
                        return Ok(ip);
                    }
                }
                Err(e) => {
                    debug!(ns = %ns_name, error = %e, "nameserver resolution failed");
                }
            }
        }

        Err(ResolverError::Fatal)
    }

    /// Caches every record of a terminal answer under its owner name.
    fn cache_records(&self, lookup: &Lookup) {
        if let Some(cache) = &self.cache {
            cache.set_multi(lookup.all_records());
        }
    }
}
