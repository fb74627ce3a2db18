//! End-to-end tests running the full pipeline against in-process
//! listeners and mock upstreams on loopback.

use sifter_cache::Cache;
use sifter_filter::{FilterEngine, FilterMode};
use sifter_proto::{Message, Name, Question, ResourceRecord, ResponseCode};
use sifter_resolver::{DnsClient, ForwardingResolver};
use sifter_server::{PipelineHandler, QueryHandler, TcpServer, UdpServer};
use sifter_store::MemoryStore;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time::timeout;

const EXAMPLE_A: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

/// Spawns a mock upstream answering every A query with `EXAMPLE_A`,
/// TTL 300. Returns its port and a query counter.
async fn spawn_upstream() -> (u16, Arc<AtomicUsize>) {
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
                response.add_answer(ResourceRecord::a(name, 300, EXAMPLE_A));
                let _ = socket.send_to(&response.to_wire(), peer).await;
            }
        }
    });

    (port, queries)
}

/// Builds a forwarding pipeline pointed at the mock upstream.
fn forwarding_handler(
    upstream_port: u16,
    filter: Option<Arc<FilterEngine>>,
    cache: Option<Arc<Cache>>,
) -> Arc<PipelineHandler> {
    let client = DnsClient::with_timeouts(
        Duration::from_millis(500),
        Duration::from_millis(500),
        Duration::from_millis(500),
    )
    .with_port(upstream_port);

    let resolver = Arc::new(ForwardingResolver::with_client(
        client,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        cache.clone(),
    ));

    Arc::new(PipelineHandler::new(
        filter,
        cache,
        Arc::new(MemoryStore::new()),
        resolver,
        None,
        true,
    ))
}

/// Starts a UDP listener for `handler`, returning its address and the
/// shutdown sender.
async fn start_udp(handler: Arc<dyn QueryHandler>) -> (SocketAddr, broadcast::Sender<()>) {
    let server = Arc::new(
        UdpServer::bind("127.0.0.1:0".parse().unwrap(), handler)
            .await
            .unwrap(),
    );
    let addr = server.local_addr();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move { server.run(shutdown_rx).await });

    (addr, shutdown_tx)
}

/// Sends raw bytes to a UDP server and returns the reply bytes.
async fn udp_exchange(server: SocketAddr, wire: &[u8]) -> Vec<u8> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(wire, server).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let len = timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("no response within deadline")
        .unwrap();
    buf.truncate(len);
    buf
}

async fn udp_query(server: SocketAddr, query: &Message) -> Message {
    let reply = udp_exchange(server, &query.to_wire()).await;
    Message::parse(&reply).unwrap()
}

fn a_query(name: &str, id: u16) -> Message {
    let mut query = Message::query(Question::a(Name::from_str(name).unwrap()));
    query.set_id(id);
    query
}

#[tokio::test]
async fn forwarding_hit() {
    let (upstream_port, queries) = spawn_upstream().await;
    let cache = Arc::new(Cache::new(Duration::from_secs(300)));
    let handler = forwarding_handler(upstream_port, None, Some(cache));
    let (addr, shutdown) = start_udp(handler).await;

    let response = udp_query(addr, &a_query("example.com", 0x1234)).await;

    assert_eq!(response.id(), 0x1234);
    assert!(response.is_response());
    assert!(response.header().recursion_available());
    assert_eq!(response.rcode(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);

    let answer = &response.answers()[0];
    assert_eq!(answer.name().to_string(), "example.com.");
    assert_eq!(answer.ttl(), 300);
    assert_eq!(answer.rdata().as_a(), Some(EXAMPLE_A));
    assert_eq!(queries.load(Ordering::SeqCst), 1);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn cache_replay_avoids_upstream() {
    let (upstream_port, queries) = spawn_upstream().await;
    let cache = Arc::new(Cache::new(Duration::from_secs(300)));
    let handler = forwarding_handler(upstream_port, None, Some(cache));
    let (addr, shutdown) = start_udp(handler).await;

    let first = udp_query(addr, &a_query("example.com", 0x1111)).await;
    assert_eq!(queries.load(Ordering::SeqCst), 1);

    // A repeat within the TTL is served from the cache: same answer
    // (modulo ID and remaining TTL), no further upstream traffic.
    let second = udp_query(addr, &a_query("example.com", 0x2222)).await;
    assert_eq!(queries.load(Ordering::SeqCst), 1);

    assert_eq!(second.id(), 0x2222);
    assert_eq!(
        second.answers()[0].rdata().as_a(),
        first.answers()[0].rdata().as_a()
    );
    assert!(second.answers()[0].ttl() <= 300);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn filter_null_answers_without_upstream() {
    let (upstream_port, queries) = spawn_upstream().await;

    let filter = Arc::new(FilterEngine::new(
        FilterMode::Null,
        300,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
    ));
    filter.add_rule("0.0.0.0 ads.example.com").unwrap();

    let handler = forwarding_handler(upstream_port, Some(filter), None);
    let (addr, shutdown) = start_udp(handler).await;

    let response = udp_query(addr, &a_query("ads.example.com", 0x0042)).await;

    assert_eq!(response.rcode(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    let answer = &response.answers()[0];
    assert_eq!(answer.name().to_string(), "ads.example.com.");
    assert_eq!(answer.rdata().as_a(), Some(Ipv4Addr::UNSPECIFIED));
    assert_eq!(answer.ttl(), 300);

    // The filter decided the answer; the upstream saw nothing.
    assert_eq!(queries.load(Ordering::SeqCst), 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn filter_nxdomain_clears_answers() {
    let (upstream_port, _) = spawn_upstream().await;

    let filter = Arc::new(FilterEngine::new(
        FilterMode::NxDomain,
        300,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
    ));
    filter.add_rule("ads.example.com").unwrap();

    let handler = forwarding_handler(upstream_port, Some(filter), None);
    let (addr, shutdown) = start_udp(handler).await;

    let response = udp_query(addr, &a_query("ads.example.com", 7)).await;
    assert_eq!(response.rcode(), ResponseCode::NameError);
    assert!(response.answers().is_empty());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn lying_qdcount_is_rejected() {
    let (upstream_port, queries) = spawn_upstream().await;
    let handler = forwarding_handler(upstream_port, None, None);
    let (addr, shutdown) = start_udp(handler).await;

    // One well-formed question, but a header claiming five.
    let mut wire = a_query("example.com", 0x0505).to_wire().to_vec();
    wire[4] = 0x00;
    wire[5] = 0x05;

    let reply = udp_exchange(addr, &wire).await;
    let response = Message::parse(&reply).unwrap();

    assert_eq!(response.id(), 0x0505);
    assert_eq!(response.rcode(), ResponseCode::FormatError);
    assert!(response.answers().is_empty());
    assert_eq!(queries.load(Ordering::SeqCst), 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn responses_are_ignored() {
    let (upstream_port, _) = spawn_upstream().await;
    let handler = forwarding_handler(upstream_port, None, None);
    let (addr, shutdown) = start_udp(handler).await;

    // A message with QR set must be dropped without any reply.
    let mut message = a_query("example.com", 1);
    message.header_mut().set_response(true);

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(&message.to_wire(), addr).await.unwrap();

    let mut buf = [0u8; 512];
    let result = timeout(Duration::from_millis(300), socket.recv(&mut buf)).await;
    assert!(result.is_err());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn non_query_opcode_is_notimp() {
    let (upstream_port, _) = spawn_upstream().await;
    let handler = forwarding_handler(upstream_port, None, None);
    let (addr, shutdown) = start_udp(handler).await;

    let mut message = a_query("example.com", 0x00AA);
    message.header_mut().opcode = 2; // STATUS

    let reply = udp_exchange(addr, &message.to_wire()).await;
    let response = Message::parse(&reply).unwrap();

    assert_eq!(response.id(), 0x00AA);
    assert_eq!(response.rcode(), ResponseCode::NotImplemented);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn tcp_query_roundtrip() {
    let (upstream_port, _) = spawn_upstream().await;
    let handler = forwarding_handler(upstream_port, None, None);

    let server = Arc::new(
        TcpServer::bind("127.0.0.1:0".parse().unwrap(), handler)
            .await
            .unwrap(),
    );
    let addr = server.local_addr();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move { server.run(shutdown_rx).await });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let wire = a_query("example.com", 0x0BAD).to_wire();
    stream
        .write_all(&(wire.len() as u16).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(&wire).await.unwrap();

    let mut len_buf = [0u8; 2];
    timeout(Duration::from_secs(2), stream.read_exact(&mut len_buf))
        .await
        .unwrap()
        .unwrap();
    let mut frame = vec![0u8; u16::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut frame).await.unwrap();

    let response = Message::parse(&frame).unwrap();
    assert_eq!(response.id(), 0x0BAD);
    assert_eq!(response.answers()[0].rdata().as_a(), Some(EXAMPLE_A));

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn edns_opt_is_transported() {
    let (upstream_port, _) = spawn_upstream().await;
    let handler = forwarding_handler(upstream_port, None, None);
    let (addr, shutdown) = start_udp(handler).await;

    let mut query = a_query("example.com", 0x0E0E);
    query.set_edns(Some(sifter_proto::Edns::new()));

    let response = udp_query(addr, &query).await;

    // The OPT pseudo-RR is echoed back on the response.
    assert!(response.edns().is_some());
    assert_eq!(response.edns().unwrap().udp_size(), 4096);

    let _ = shutdown.send(());
}
