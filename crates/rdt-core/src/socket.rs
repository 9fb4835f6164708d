//! Datagram I/O facade: a thin wrapper over [`std::net::UdpSocket`] that
//! turns "closed" into an observable state instead of a blocked read that
//! never returns.
//!
//! The blocking [`DatagramSocket::recv`] call relies on a short read
//! timeout so a background listener can periodically re-check the
//! `closed` flag rather than requiring a self-pipe or a platform-specific
//! wakeup primitive.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, RdtError};

/// Polling interval used while blocked in `recv`, so `close()` is
/// observed promptly without spinning.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Largest datagram this facade will read. Anything longer is truncated
/// by the kernel socket call and will fail CRC verification upstream,
/// so truncation is safe rather than silently corrupting.
pub const MAX_DATAGRAM_LEN: usize = 2048;

pub struct DatagramSocket {
    socket: UdpSocket,
    closed: AtomicBool,
}

impl DatagramSocket {
    pub fn bind(local_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local_addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        Ok(DatagramSocket {
            socket,
            closed: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Fire-and-forget send. Transient I/O failures are logged, not
    /// surfaced — the GBN retransmission timer is the recovery path for a
    /// dropped send, not this call's return value.
    pub fn send_to(&self, peer: SocketAddr, bytes: &[u8]) {
        if let Err(err) = self.socket.send_to(bytes, peer) {
            warn!(%peer, %err, "datagram send failed");
        }
    }

    /// Blocks until a datagram arrives or the socket is closed, whichever
    /// is first. Returns `Ok(None)` once closed.
    pub fn recv(&self) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            match self.socket.recv_from(&mut buf) {
                Ok((len, peer)) => return Ok(Some((buf[..len].to_vec(), peer))),
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(err) => return Err(RdtError::DatagramIo(err)),
            }
        }
    }

    /// Idempotent. Wakes any thread blocked in [`Self::recv`] within one
    /// poll interval.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
