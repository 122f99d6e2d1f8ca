//! Datagram transport: one UDP packet per message.

use crate::error::Result;
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use super::{MessageSink, MessageSource};

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

/// Receives messages on a bound UDP socket.
#[derive(Debug)]
pub struct UdpSource {
    socket: UdpSocket,
}

impl UdpSource {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr)?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl MessageSource for UdpSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        // A zero read timeout is rejected by the socket API.
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((len, _from)) => {
                buf.truncate(len);
                Ok(Some(buf))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sends each message as a datagram to a fixed peer.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Bind an ephemeral local socket and connect it to `target`. Each
    /// resolved address is tried in turn with a socket of its family.
    pub fn connect(target: impl ToSocketAddrs) -> Result<Self> {
        let mut last_err = None;
        for peer in target.to_socket_addrs()? {
            let attempt = UdpSocket::bind(unspecified_for(&peer)).and_then(|socket| {
                socket.connect(peer)?;
                Ok(socket)
            });
            match attempt {
                Ok(socket) => return Ok(Self { socket }),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| io::Error::new(ErrorKind::InvalidInput, "no address to connect to"))
            .into())
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.peer_addr()?)
    }
}

/// Ephemeral wildcard address in the same family as `peer`.
fn unspecified_for(peer: &SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

impl MessageSink for UdpSink {
    fn send(&self, raw: &[u8]) -> Result<()> {
        self.socket.send(raw)?;
        Ok(())
    }
}
