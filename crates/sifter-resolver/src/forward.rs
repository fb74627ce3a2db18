//! Forwarding resolver.
//!
//! Every lookup becomes a single query to the configured upstream; the
//! upstream's response sections are relayed and cached verbatim.

use crate::client::DnsClient;
use crate::{Lookup, Resolver, Result};
use async_trait::async_trait;
use sifter_cache::{Cache, CacheStatus};
use sifter_proto::Question;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Forwarding DNS resolver.
#[derive(Clone)]
pub struct ForwardingResolver {
    inner: Arc<Inner>,
}

struct Inner {
    client: DnsClient,
    upstream: IpAddr,
    cache: Option<Arc<Cache>>,
}

impl ForwardingResolver {
    /// Creates a resolver forwarding to `upstream`.
    pub fn new(upstream: IpAddr, cache: Option<Arc<Cache>>) -> Self {
        Self::with_client(DnsClient::new(), upstream, cache)
    }

    /// Creates a resolver with an explicit client.
    pub fn with_client(client: DnsClient, upstream: IpAddr, cache: Option<Arc<Cache>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                upstream,
                cache,
            }),
        }
    }

    /// Returns the upstream address.
    pub fn upstream(&self) -> IpAddr {
        self.inner.upstream
    }
}

#[async_trait]
impl Resolver for ForwardingResolver {
    async fn resolve(&self, question: &Question) -> Result<Lookup> {
        if let Some(cache) = &self.inner.cache {
            let cached = cache.lookup_question(question);
            match cached.status {
                CacheStatus::Hit => {
                    trace!(question = %question, "cache hit");
                    return Ok(Lookup::cached(cached.records));
                }
                CacheStatus::Expired => {
                    trace!(question = %question, "serving stale, refreshing");
                    let inner = self.inner.clone();
                    let refresh = question.clone();
                    tokio::spawn(async move {
                        if let Err(e) = inner.forward(&refresh).await {
                            debug!(error = %e, "background refresh failed");
                        }
                    });
                    return Ok(Lookup::cached(cached.records));
                }
                CacheStatus::Miss => {}
            }
        }

        self.inner.forward(question).await
    }
}

impl Inner {
    async fn forward(&self, question: &Question) -> Result<Lookup> {
        trace!(question = %question, upstream = %self.upstream, "forwarding");
        let response = self.client.query(question.clone(), self.upstream).await?;
        let lookup = Lookup::from_response(&response);

        if let Some(cache) = &self.cache {
            cache.set_multi(lookup.all_records());
        }

        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::{Message, Name, ResourceRecord};
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    async fn spawn_upstream(addr: Ipv4Addr) -> (u16, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = queries.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                if let Ok(query) = Message::parse(&buf[..len]) {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let mut response = Message::response_from(&query);
                    let name = query.question().unwrap().qname.clone();
                    response.add_answer(ResourceRecord::a(name, 300, addr));
                    let _ = socket.send_to(&response.to_wire(), peer).await;
                }
            }
        });

        (port, queries)
    }

    fn resolver(port: u16, cache: Option<Arc<Cache>>) -> ForwardingResolver {
        let client = DnsClient::with_timeouts(
            Duration::from_millis(500),
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .with_port(port);
        ForwardingResolver::with_client(client, IpAddr::V4(Ipv4Addr::LOCALHOST), cache)
    }

    #[tokio::test]
    async fn test_forwarding_answers_and_caches() {
        let (port, queries) = spawn_upstream(Ipv4Addr::new(93, 184, 216, 34)).await;
        let cache = Arc::new(Cache::new(Duration::from_secs(300)));
        let resolver = resolver(port, Some(cache));

        let question = Question::a(Name::from_str("example.com").unwrap());
        let lookup = resolver.resolve(&question).await.unwrap();

        assert!(!lookup.cached);
        assert_eq!(
            lookup.answers[0].rdata().as_a(),
            Some(Ipv4Addr::new(93, 184, 216, 34))
        );
        assert_eq!(queries.load(Ordering::SeqCst), 1);

        // The second resolution must come from the cache, without any
        // further upstream traffic.
        let second = resolver.resolve(&question).await.unwrap();
        assert!(second.cached);
        assert!(second.answers[0].ttl() <= 300);
        assert_eq!(queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forwarding_without_cache() {
        let (port, queries) = spawn_upstream(Ipv4Addr::new(192, 0, 2, 1)).await;
        let resolver = resolver(port, None);

        let question = Question::a(Name::from_str("example.com").unwrap());
        resolver.resolve(&question).await.unwrap();
        resolver.resolve(&question).await.unwrap();

        assert_eq!(queries.load(Ordering::SeqCst), 2);
    }
}
