//! The query pipeline.
//!
//! Per accepted message: filter → cache → local store → resolver →
//! response assembly, with a collector entry handed off asynchronously
//! at the end.

use crate::Protocol;
use async_trait::async_trait;
use sifter_cache::Cache;
use sifter_filter::{FilterAction, FilterEngine};
use sifter_proto::{Message, Question, ResponseCode};
use sifter_resolver::{Resolver, ResolverError};
use sifter_store::RecordStore;
use sifter_telemetry::{Collector, Entry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Context of a single DNS query.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Client address.
    pub client: SocketAddr,
    /// Transport the query arrived on.
    pub protocol: Protocol,
    /// When the query was received.
    pub received_at: Instant,
}

impl QueryContext {
    /// Creates a context stamped with the current time.
    pub fn new(client: SocketAddr, protocol: Protocol) -> Self {
        Self {
            client,
            protocol,
            received_at: Instant::now(),
        }
    }

    /// Returns the time spent on this query so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.received_at.elapsed()
    }
}

/// Handles accepted DNS queries.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Handles a query, returning the response to send.
    ///
    /// `None` means the query is dropped without a response (for example
    /// a message whose body carries no question).
    async fn handle(&self, query: Message, context: QueryContext) -> Option<Message>;
}

/// The standard query pipeline.
pub struct PipelineHandler {
    filter: Option<Arc<FilterEngine>>,
    cache: Option<Arc<Cache>>,
    store: Arc<dyn RecordStore>,
    resolver: Arc<dyn Resolver>,
    collector: Option<Collector>,
    recursion_available: bool,
}

impl PipelineHandler {
    /// Creates a pipeline from its collaborators.
    ///
    /// `recursion_available` reflects whether the configured resolver
    /// actually recurses; it drives the RA flag on responses.
    pub fn new(
        filter: Option<Arc<FilterEngine>>,
        cache: Option<Arc<Cache>>,
        store: Arc<dyn RecordStore>,
        resolver: Arc<dyn Resolver>,
        collector: Option<Collector>,
        recursion_available: bool,
    ) -> Self {
        Self {
            filter,
            cache,
            store,
            resolver,
            collector,
            recursion_available,
        }
    }

    /// Sets QR and RA on an outgoing response.
    fn finalize(&self, query: &Message, response: &mut Message) {
        response.header_mut().set_response(true);
        response
            .header_mut()
            .set_recursion_available(
                query.header().recursion_desired() && self.recursion_available,
            );
    }

    /// Hands a collector entry off without delaying the response.
    fn collect(&self, entry: Entry) {
        if let Some(collector) = &self.collector {
            let collector = collector.clone();
            tokio::spawn(async move {
                collector.record(entry).await;
            });
        }
    }

    fn entry_for(
        question: &Question,
        response: &Message,
        context: &QueryContext,
        filtered: bool,
        cached: bool,
    ) -> Entry {
        let mut entry = Entry::new(
            question.clone(),
            response.answers().to_vec(),
            context.client.ip(),
            context.elapsed(),
        );
        entry.filtered = filtered;
        entry.cached = cached;
        entry
    }
}

#[async_trait]
impl QueryHandler for PipelineHandler {
    async fn handle(&self, query: Message, context: QueryContext) -> Option<Message> {
        let Some(question) = query.question().cloned() else {
            // The header promised a question the body does not carry.
            debug!(client = %context.client, "dropping query without question");
            return None;
        };

        trace!(client = %context.client, question = %question, "handling query");
        let mut response = Message::response_from(&query);

        // Filter verdicts bypass resolution entirely.
        if let Some(filter) = &self.filter {
            if let Some(action) = filter.matches(&question) {
                match action {
                    FilterAction::NxDomain => response.set_rcode(ResponseCode::NameError),
                    FilterAction::NoData => {}
                    FilterAction::Answer(record) => response.add_answer(record),
                }

                self.finalize(&query, &mut response);
                self.collect(Self::entry_for(&question, &response, &context, true, false));
                return Some(response);
            }
        }

        // Serve straight from the cache on a hit; expired entries are the
        // resolver's business (it serves stale and refreshes).
        if let Some(cache) = &self.cache {
            let lookup = cache.lookup_question(&question);
            if lookup.is_hit() {
                response.add_answers(lookup.records);
                self.finalize(&query, &mut response);
                self.collect(Self::entry_for(&question, &response, &context, false, true));
                return Some(response);
            }
        }

        // Authoritative records win over anything remote.
        if let Ok(records) = self.store.get(&question) {
            response.header_mut().set_authoritative(true);
            response.add_answers(records);
            self.finalize(&query, &mut response);
            self.collect(Self::entry_for(&question, &response, &context, false, false));
            return Some(response);
        }

        let mut cached = false;
        match self.resolver.resolve(&question).await {
            Ok(lookup) => {
                cached = lookup.cached;
                response.set_rcode(lookup.rcode);
                response.add_sections(lookup.answers, lookup.authority, lookup.additional);
            }
            Err(ResolverError::NoAnswer) => {
                // The upstream had nothing for us; an empty NOERROR tells
                // the client as much.
            }
            Err(ResolverError::Timeout) => {
                debug!(question = %question, "resolver deadline exceeded, dropping");
                return None;
            }
            Err(e) => {
                warn!(question = %question, error = %e, "resolution failed");
                response.set_rcode(ResponseCode::ServerFailure);
            }
        }

        self.finalize(&query, &mut response);
        self.collect(Self::entry_for(&question, &response, &context, false, cached));
        Some(response)
    }
}
