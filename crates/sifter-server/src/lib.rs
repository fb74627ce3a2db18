//! # Sifter DNS Server
//!
//! UDP and TCP listeners feeding the query pipeline. The UDP listener is
//! a single reader pulling datagrams off the socket; each accepted
//! message is handled in its own task. TCP runs a task per connection
//! with 2-byte length framing.
//!
//! Shutdown is signaled over a broadcast channel: the accept loops exit
//! and in-flight request tasks are awaited before `run` returns.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accept;
pub mod handler;
pub mod pool;
pub mod tcp;
pub mod udp;

pub use accept::{default_accept, AcceptAction};
pub use handler::{PipelineHandler, QueryContext, QueryHandler};
pub use pool::BufferPool;
pub use tcp::TcpServer;
pub use udp::UdpServer;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// IO error on a listener socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `run` was called while the server was already running.
    #[error("server already running")]
    AlreadyRunning,
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// DNS transport protocol of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Datagram transport.
    Udp,
    /// Stream transport with 2-byte length framing.
    Tcp,
}

impl Protocol {
    /// Returns the protocol name.
    pub const fn name(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A DNS server instance: one listener plus shutdown plumbing.
pub struct Server {
    address: SocketAddr,
    protocol: Protocol,
    handler: Arc<dyn QueryHandler>,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a server listening on `address` with the given transport.
    pub fn new(address: SocketAddr, protocol: Protocol, handler: Arc<dyn QueryHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            address,
            protocol,
            handler,
            shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Returns the configured listen address.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Runs the listener until shutdown; redundant starts are rejected.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let shutdown_rx = self.shutdown_tx.subscribe();
        let result = match self.protocol {
            Protocol::Udp => {
                let server = UdpServer::bind(self.address, self.handler.clone()).await?;
                server.run(shutdown_rx).await
            }
            Protocol::Tcp => {
                let server = TcpServer::bind(self.address, self.handler.clone()).await?;
                server.run(shutdown_rx).await
            }
        };

        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Signals shutdown; `run` drains in-flight requests and returns.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names() {
        assert_eq!(Protocol::Udp.name(), "udp");
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
    }
}
