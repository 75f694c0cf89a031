//! Async UDP socket wrapper for PeerLink transport.
//!
//! Sends are fire-and-forget. Receives wait for at most a bounded timeout so
//! the owning loop can observe shutdown promptly.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use super::frame::Frame;

/// Async UDP socket shared by the receive, punch, and send loops.
///
/// All methods take `&self`; wrap it in an `Arc` to share it between tasks.
#[derive(Debug)]
pub struct PeerSocket {
    socket: UdpSocket,
}

impl PeerSocket {
    /// Bind a socket to the given address (port 0 picks an ephemeral port).
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Wrap an existing UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Encode and send a frame.
    pub async fn send_frame(&self, frame: &Frame, addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(&frame.encode(), addr).await
    }

    /// Receive one datagram into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing received.
    pub async fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(Ok((len, addr))) => Ok(Some((len, addr))),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}
