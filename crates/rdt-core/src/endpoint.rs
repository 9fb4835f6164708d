//! The public façade: `new`, `connect`/`accept`, `send`/`recv`, `close`.
//!
//! Binds the datagram facade, the sender/receiver engines, the peer
//! slot, and the listener thread into one object with the lifecycle
//! described in the crate's module docs.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use tracing::info;

use crate::config::RdtConfig;
use crate::error::{RdtError, Result};
use crate::listener;
use crate::peer::PeerSlot;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::socket::DatagramSocket;

pub struct RdtEndpoint {
    socket: Arc<DatagramSocket>,
    peer: Arc<PeerSlot>,
    sender: Arc<Mutex<Option<Arc<Sender>>>>,
    receiver: Arc<Receiver>,
    config: RdtConfig,
    running: Arc<AtomicBool>,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RdtEndpoint {
    /// Binds `local_addr` and starts the background listener. No peer is
    /// set yet — call [`Self::connect`] or [`Self::accept`] next.
    pub fn new(local_addr: SocketAddr, config: RdtConfig) -> Result<Self> {
        let socket = Arc::new(DatagramSocket::bind(local_addr)?);
        let peer = Arc::new(PeerSlot::new());
        let sender = Arc::new(Mutex::new(None));
        let receiver = Arc::new(Receiver::new());
        let running = Arc::new(AtomicBool::new(true));

        let listener_handle = listener::spawn(
            socket.clone(),
            peer.clone(),
            sender.clone(),
            receiver.clone(),
            running.clone(),
        );

        info!(local_addr = %socket.local_addr()?, "rdt endpoint bound");

        Ok(RdtEndpoint {
            socket,
            peer,
            sender,
            receiver,
            config,
            running,
            listener_handle: Mutex::new(Some(listener_handle)),
        })
    }

    /// Sets the peer directly and becomes ready to send/recv. Fails if a
    /// peer is already recorded.
    pub fn connect(&self, peer_addr: SocketAddr) -> Result<()> {
        if !self.peer.try_set(peer_addr) {
            return Err(RdtError::AlreadyConnected);
        }
        self.install_sender(peer_addr);
        info!(peer = %peer_addr, "connected");
        Ok(())
    }

    /// Blocks until the listener thread records a peer (the source of
    /// the first datagram received, valid or not), then returns it.
    pub fn accept(&self) -> Result<SocketAddr> {
        if self.peer.get().is_some() {
            return Err(RdtError::AlreadyConnected);
        }
        match self.peer.wait(&|| self.is_closed()) {
            Some(peer_addr) => {
                self.install_sender(peer_addr);
                info!(peer = %peer_addr, "accepted");
                Ok(peer_addr)
            }
            None => Err(RdtError::Closed),
        }
    }

    fn install_sender(&self, peer_addr: SocketAddr) {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(Arc::new(Sender::new(
                self.socket.clone(),
                peer_addr,
                self.config.clone(),
            )));
        }
    }

    /// Slices `data` into `config.max_payload_len()`-sized chunks and
    /// reliably transmits each in order. A no-op for empty input.
    ///
    /// The sender handle is cloned out from behind the lock before any
    /// chunk is transmitted: `send_chunk` blocks while the window is
    /// full, and holding this lock across that wait would deadlock
    /// against the listener thread, which needs the same lock to read
    /// the sender and deliver the ACK that unblocks the wait.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(RdtError::Closed);
        }
        let sender = {
            let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone().ok_or(RdtError::NotConnected)?
        };

        let chunk_len = self.config.max_payload_len();
        for chunk in data.chunks(chunk_len.max(1)) {
            sender.send_chunk(Bytes::copy_from_slice(chunk))?;
        }
        Ok(())
    }

    /// Blocks until one delivered payload is available and returns it,
    /// preserving the boundary of the data packet that carried it.
    pub fn recv(&self) -> Result<Bytes> {
        self.receiver
            .recv_blocking(&|| self.is_closed())
            .ok_or(RdtError::Closed)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn is_closed(&self) -> bool {
        !self.running.load(Ordering::Acquire)
    }

    /// Idempotent: cancels the retransmission timer, releases the
    /// socket, wakes any blocked `recv`/`accept` calls, and joins both
    /// the listener thread and the timer thread before returning.
    pub fn close(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(sender) = sender {
            sender.shutdown();
        }

        self.socket.close();
        self.receiver.wake();
        self.peer.wake_waiters();

        let handle = self
            .listener_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        info!("rdt endpoint closed");
    }
}

impl Drop for RdtEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
