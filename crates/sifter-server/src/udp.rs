//! UDP listener.

use crate::accept::{default_accept, AcceptAction};
use crate::handler::{QueryContext, QueryHandler};
use crate::pool::BufferPool;
use crate::{Protocol, Result};
use sifter_proto::{Header, Message, MessageWriter, ResponseCode, MAX_UDP_MESSAGE_SIZE};
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace};

/// UDP DNS listener: one reader task, one handler task per datagram.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    handler: Arc<dyn QueryHandler>,
    pool: Arc<BufferPool>,
    local_addr: SocketAddr,
}

impl UdpServer {
    /// Binds a UDP listener to `addr`.
    pub async fn bind(addr: SocketAddr, handler: Arc<dyn QueryHandler>) -> Result<Self> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;
        let local_addr = socket.local_addr()?;

        info!(addr = %local_addr, "udp listener bound");

        Ok(Self {
            socket: Arc::new(socket),
            handler,
            pool: Arc::new(BufferPool::new()),
            local_addr,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the read loop until shutdown, then awaits in-flight tasks.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut tasks = JoinSet::new();
        let mut buffer = self.pool.get();

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((len, peer)) => {
                            // Lend the filled buffer to the request task
                            // and keep reading into a fresh one.
                            let filled = std::mem::replace(&mut buffer, self.pool.get());
                            let socket = self.socket.clone();
                            let handler = self.handler.clone();
                            let pool = self.pool.clone();

                            tasks.spawn(async move {
                                handle_datagram(socket, handler, &filled[..len], peer).await;
                                pool.put(filled);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "udp receive failed");
                        }
                    }
                }
                // Reap finished handler tasks as they complete.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                _ = shutdown.recv() => break,
            }
        }

        info!(addr = %self.local_addr, inflight = tasks.len(), "udp listener draining");
        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}

/// Decodes, dispatches, and answers one datagram.
async fn handle_datagram(
    socket: Arc<UdpSocket>,
    handler: Arc<dyn QueryHandler>,
    data: &[u8],
    peer: SocketAddr,
) {
    // Header first: the accept policy runs before body decode.
    let header = match Header::parse(data) {
        Ok(header) => header,
        Err(e) => {
            trace!(client = %peer, error = %e, "dropping undecodable datagram");
            return;
        }
    };

    match default_accept(&header) {
        AcceptAction::Ignore => return,
        AcceptAction::NotImplemented => {
            respond_with_rcode(&socket, &header, peer, ResponseCode::NotImplemented).await;
            return;
        }
        AcceptAction::Reject => {
            respond_with_rcode(&socket, &header, peer, ResponseCode::FormatError).await;
            return;
        }
        AcceptAction::Accept => {}
    }

    let query = match Message::parse(data) {
        Ok(message) => message,
        Err(e) => {
            trace!(client = %peer, error = %e, "dropping undecodable query body");
            return;
        }
    };

    // The client's advertised receive size caps the response.
    let max_size = query
        .edns()
        .map(|e| usize::from(e.udp_size()))
        .unwrap_or(MAX_UDP_MESSAGE_SIZE);

    let context = QueryContext::new(peer, Protocol::Udp);
    let Some(mut response) = handler.handle(query, context).await else {
        return;
    };

    let mut wire = response.to_wire();
    if wire.len() > max_size {
        response.truncate_to(max_size);
        wire = response.to_wire();
    }

    if let Err(e) = socket.send_to(&wire, peer).await {
        debug!(client = %peer, error = %e, "udp send failed");
    }
}

/// Answers with a bare header carrying `rcode`.
async fn respond_with_rcode(
    socket: &UdpSocket,
    header: &Header,
    peer: SocketAddr,
    rcode: ResponseCode,
) {
    let mut response = Header::response_from(header);
    response.qd_count = 0;
    response.set_response_code(rcode);

    let mut writer = MessageWriter::new(sifter_proto::HEADER_SIZE);
    let message = Message::new(response);
    message.write(&mut writer);

    if let Err(e) = socket.send_to(writer.as_bytes(), peer).await {
        debug!(client = %peer, error = %e, "udp send failed");
    }
}
