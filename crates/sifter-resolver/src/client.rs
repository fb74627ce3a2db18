//! Upstream DNS client.
//!
//! Sends queries over UDP with a TCP retry on truncation. Dial, write,
//! and read each run under their own deadline, and header IDs are drawn
//! uniformly from `[1, 0xFFFF]` behind a lock.

use crate::{ResolverError, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sifter_proto::{Message, Question};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::trace;

/// Default per-step deadline for dial, write, and read.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Upstream DNS client.
#[derive(Debug)]
pub struct DnsClient {
    dial_timeout: Duration,
    write_timeout: Duration,
    read_timeout: Duration,
    port: u16,
    id_rng: Mutex<StdRng>,
}

impl DnsClient {
    /// Creates a client with the default 2-second step deadlines.
    pub fn new() -> Self {
        Self::with_timeouts(
            DEFAULT_STEP_TIMEOUT,
            DEFAULT_STEP_TIMEOUT,
            DEFAULT_STEP_TIMEOUT,
        )
    }

    /// Creates a client with explicit dial/write/read deadlines.
    pub fn with_timeouts(dial: Duration, write: Duration, read: Duration) -> Self {
        Self {
            dial_timeout: dial,
            write_timeout: write,
            read_timeout: read,
            port: 53,
            id_rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Overrides the upstream port (default 53).
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Draws a fresh header ID from `[1, 0xFFFF]`.
    pub fn next_id(&self) -> u16 {
        self.id_rng.lock().gen_range(1..=u16::MAX)
    }

    /// Sends `question` to `server` on the configured port and returns
    /// the reply.
    ///
    /// Queries go out over UDP; a truncated reply is retried over TCP.
    pub async fn query(&self, question: Question, server: IpAddr) -> Result<Message> {
        let addr = SocketAddr::new(server, self.port);

        let mut query = Message::query(question);
        query.set_id(self.next_id());

        trace!(%addr, id = query.id(), "querying upstream");

        let response = self.query_udp(&query, addr).await?;
        if response.is_truncated() {
            trace!(%addr, "upstream reply truncated, retrying over tcp");
            return self.query_tcp(&query, addr).await;
        }

        Ok(response)
    }

    /// Sends a prepared query over UDP.
    pub async fn query_udp(&self, query: &Message, addr: SocketAddr) -> Result<Message> {
        let bind_addr: SocketAddr = if addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        timeout(self.dial_timeout, socket.connect(addr))
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let wire = query.to_wire();
        timeout(self.write_timeout, socket.send(&wire))
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let mut buf = vec![0u8; 4096];
        let len = timeout(self.read_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let response = Message::parse(&buf[..len])?;
        Self::check_id(query, &response)?;
        Ok(response)
    }

    /// Sends a prepared query over TCP with 2-byte length framing.
    pub async fn query_tcp(&self, query: &Message, addr: SocketAddr) -> Result<Message> {
        let mut stream = timeout(self.dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let wire = query.to_wire();
        let write = async {
            stream.write_all(&(wire.len() as u16).to_be_bytes()).await?;
            stream.write_all(&wire).await
        };
        timeout(self.write_timeout, write)
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let read = async {
            let mut len_buf = [0u8; 2];
            stream.read_exact(&mut len_buf).await?;
            let len = u16::from_be_bytes(len_buf) as usize;
            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        };
        let buf = timeout(self.read_timeout, read)
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let response = Message::parse(&buf)?;
        Self::check_id(query, &response)?;
        Ok(response)
    }

    fn check_id(query: &Message, response: &Message) -> Result<()> {
        if query.id() != response.id() {
            return Err(ResolverError::HeaderIdMismatch {
                sent: query.id(),
                received: response.id(),
            });
        }
        Ok(())
    }
}

impl Default for DnsClient {
    fn default() -> Self {
        Self::new()
    }
}
