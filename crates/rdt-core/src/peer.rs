//! The single remote address an endpoint talks to, set exactly once over
//! the endpoint's lifetime — either directly by `connect` or by the
//! listener thread recording the source of the first datagram it sees
//! (`accept`).

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub struct PeerSlot {
    addr: Mutex<Option<SocketAddr>>,
    set: Condvar,
}

impl PeerSlot {
    pub fn new() -> Self {
        PeerSlot {
            addr: Mutex::new(None),
            set: Condvar::new(),
        }
    }

    /// Sets the peer if unset. Returns `true` if this call set it,
    /// `false` if a peer was already recorded.
    pub fn try_set(&self, addr: SocketAddr) -> bool {
        let mut guard = self.addr.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return false;
        }
        *guard = Some(addr);
        self.set.notify_all();
        true
    }

    pub fn get(&self) -> Option<SocketAddr> {
        *self.addr.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks until a peer is recorded or `closed` reports true.
    pub fn wait(&self, closed: &dyn Fn() -> bool) -> Option<SocketAddr> {
        let mut guard = self.addr.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(addr) = *guard {
                return Some(addr);
            }
            if closed() {
                return None;
            }
            let (g, _timeout) = self
                .set
                .wait_timeout(guard, Duration::from_millis(100))
                .unwrap_or_else(|e| e.into_inner());
            guard = g;
        }
    }

    pub fn wake_waiters(&self) {
        self.set.notify_all();
    }
}

impl Default for PeerSlot {
    fn default() -> Self {
        Self::new()
    }
}
