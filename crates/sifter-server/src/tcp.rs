//! TCP listener.
//!
//! Connection-per-task after accept; messages are framed with a 2-byte
//! big-endian length prefix per RFC 1035 §4.2.2.

use crate::accept::{default_accept, AcceptAction};
use crate::handler::{QueryContext, QueryHandler};
use crate::{Protocol, Result};
use sifter_proto::{Header, Message, ResponseCode};
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, trace};

/// Idle timeout before a quiet connection is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listen backlog.
const BACKLOG: i32 = 1024;

/// TCP DNS listener.
pub struct TcpServer {
    listener: TcpListener,
    handler: Arc<dyn QueryHandler>,
    local_addr: SocketAddr,
}

impl TcpServer {
    /// Binds a TCP listener to `addr`.
    pub async fn bind(addr: SocketAddr, handler: Arc<dyn QueryHandler>) -> Result<Self> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(BACKLOG)?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "tcp listener bound");

        Ok(Self {
            listener,
            handler,
            local_addr,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until shutdown, then awaits open connections.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let handler = self.handler.clone();
                            connections.spawn(async move {
                                if let Err(e) = serve_connection(stream, peer, handler).await {
                                    debug!(client = %peer, error = %e, "tcp connection ended");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "tcp accept failed");
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown.recv() => break,
            }
        }

        info!(addr = %self.local_addr, open = connections.len(), "tcp listener draining");
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

/// Serves queries on one connection until EOF, error, or idle timeout.
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn QueryHandler>,
) -> std::io::Result<()> {
    trace!(client = %peer, "tcp connection opened");

    loop {
        let frame = match timeout(IDLE_TIMEOUT, read_frame(&mut stream)).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                trace!(client = %peer, "tcp connection closed by client");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                trace!(client = %peer, "tcp connection idle timeout");
                return Ok(());
            }
        };

        let header = match Header::parse(&frame) {
            Ok(header) => header,
            Err(e) => {
                trace!(client = %peer, error = %e, "dropping undecodable tcp message");
                continue;
            }
        };

        match default_accept(&header) {
            AcceptAction::Ignore => continue,
            AcceptAction::NotImplemented => {
                write_rcode(&mut stream, &header, ResponseCode::NotImplemented).await?;
                continue;
            }
            AcceptAction::Reject => {
                write_rcode(&mut stream, &header, ResponseCode::FormatError).await?;
                continue;
            }
            AcceptAction::Accept => {}
        }

        let query = match Message::parse(&frame) {
            Ok(message) => message,
            Err(e) => {
                trace!(client = %peer, error = %e, "dropping undecodable query body");
                continue;
            }
        };

        let context = QueryContext::new(peer, Protocol::Tcp);
        if let Some(response) = handler.handle(query, context).await {
            write_frame(&mut stream, &response.to_wire()).await?;
        }
    }
}

/// Reads one length-prefixed message.
async fn read_frame(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    if len == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "zero-length tcp message",
        ));
    }

    let mut frame = vec![0u8; len];
    stream.read_exact(&mut frame).await?;
    Ok(frame)
}

/// Writes one length-prefixed message.
async fn write_frame(stream: &mut TcpStream, data: &[u8]) -> std::io::Result<()> {
    stream.write_all(&(data.len() as u16).to_be_bytes()).await?;
    stream.write_all(data).await
}

/// Writes a bare-header response carrying `rcode`.
async fn write_rcode(
    stream: &mut TcpStream,
    header: &Header,
    rcode: ResponseCode,
) -> std::io::Result<()> {
    let mut response = Header::response_from(header);
    response.qd_count = 0;
    response.set_response_code(rcode);

    let message = Message::new(response);
    write_frame(stream, &message.to_wire()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Refuser;

    #[async_trait]
    impl QueryHandler for Refuser {
        async fn handle(&self, query: Message, _context: QueryContext) -> Option<Message> {
            let mut response = Message::response_from(&query);
            response.set_rcode(ResponseCode::Refused);
            Some(response)
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap(), Arc::new(Refuser))
            .await
            .unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }
}
