//! Go-Back-N receiver engine.
//!
//! Strictly in-order delivery: a data packet is accepted only when its
//! sequence number equals `expected_seq`. Anything else — a duplicate of
//! an already-delivered packet, or a packet arriving ahead of a gap — is
//! discarded without buffering, which is what makes the sender's
//! whole-window retransmission on timeout the correct repair mechanism.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};

use bytes::Bytes;
use tracing::trace;

use crate::socket::DatagramSocket;
use crate::wire::Packet;

struct ReceiverState {
    expected_seq: u32,
    delivered: VecDeque<Bytes>,
    /// Whether at least one in-order delivery has occurred. Used solely
    /// to suppress the spurious ack-for-seq-0 a duplicate/out-of-order
    /// packet would otherwise provoke before any real progress has been
    /// made.
    has_delivered: bool,
}

pub struct Receiver {
    state: Mutex<ReceiverState>,
    has_data: Condvar,
}

impl Receiver {
    pub fn new() -> Self {
        Receiver {
            state: Mutex::new(ReceiverState {
                expected_seq: 0,
                delivered: VecDeque::new(),
                has_delivered: false,
            }),
            has_data: Condvar::new(),
        }
    }

    /// Processes an inbound data packet. Returns `Some(ack_seq)` when an
    /// ACK should be sent back to the peer, `None` when the packet was
    /// out of order (and therefore silently dropped, per GBN).
    pub fn on_data(&self, seq: u32, payload: Bytes) -> Option<u32> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if seq == state.expected_seq {
            state.delivered.push_back(payload);
            state.expected_seq += 1;
            state.has_delivered = true;
            self.has_data.notify_all();
            Some(state.expected_seq - 1)
        } else if state.has_delivered {
            trace!(seq, expected = state.expected_seq, "out-of-order packet dropped");
            Some(state.expected_seq.wrapping_sub(1))
        } else {
            trace!(seq, "out-of-order packet dropped before first delivery");
            None
        }
    }

    /// Blocks until a payload is available, then returns it. Returns
    /// `None` if `wake` is used to abandon the wait (endpoint closing).
    pub fn recv_blocking(&self, closed: &dyn Fn() -> bool) -> Option<Bytes> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(payload) = state.delivered.pop_front() {
                return Some(payload);
            }
            if closed() {
                return None;
            }
            let (guard, _timeout) = self
                .has_data
                .wait_timeout(state, std::time::Duration::from_millis(100))
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }

    pub fn wake(&self) {
        self.has_data.notify_all();
    }

    pub fn expected_seq(&self) -> u32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).expected_seq
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits the ACK produced by [`Receiver::on_data`], if any, to `peer`
/// via `socket`. Kept as a free function since the listener is the only
/// caller and it otherwise has no reason to depend on `Receiver`'s
/// internals.
pub fn send_ack(socket: &DatagramSocket, peer: SocketAddr, ack_seq: u32) {
    let packet = Packet::ack(ack_seq);
    socket.send_to(peer, &packet.encode());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_delivery_acks_and_enqueues() {
        let receiver = Receiver::new();
        let ack = receiver.on_data(0, Bytes::from_static(b"a"));
        assert_eq!(ack, Some(0));
        assert_eq!(receiver.expected_seq(), 1);

        let payload = receiver.recv_blocking(&|| false).unwrap();
        assert_eq!(&payload[..], b"a");
    }

    #[test]
    fn out_of_order_before_any_delivery_is_silently_dropped() {
        let receiver = Receiver::new();
        let ack = receiver.on_data(3, Bytes::from_static(b"late"));
        assert_eq!(ack, None);
        assert_eq!(receiver.expected_seq(), 0);
    }

    #[test]
    fn duplicate_after_delivery_reacks_last_in_order() {
        let receiver = Receiver::new();
        receiver.on_data(0, Bytes::from_static(b"a"));
        let ack = receiver.on_data(0, Bytes::from_static(b"a"));
        assert_eq!(ack, Some(0));
        assert_eq!(receiver.expected_seq(), 1);
    }

    #[test]
    fn gap_after_delivery_reacks_last_contiguous() {
        let receiver = Receiver::new();
        receiver.on_data(0, Bytes::from_static(b"a"));
        let ack = receiver.on_data(2, Bytes::from_static(b"c"));
        assert_eq!(ack, Some(0));
        assert_eq!(receiver.expected_seq(), 1);
    }

    #[test]
    fn sequential_delivery_preserves_order() {
        let receiver = Receiver::new();
        receiver.on_data(0, Bytes::from_static(b"a"));
        receiver.on_data(1, Bytes::from_static(b"b"));
        receiver.on_data(2, Bytes::from_static(b"c"));

        assert_eq!(&receiver.recv_blocking(&|| false).unwrap()[..], b"a");
        assert_eq!(&receiver.recv_blocking(&|| false).unwrap()[..], b"b");
        assert_eq!(&receiver.recv_blocking(&|| false).unwrap()[..], b"c");
    }

    #[test]
    fn empty_payload_is_delivered() {
        let receiver = Receiver::new();
        receiver.on_data(0, Bytes::new());
        let payload = receiver.recv_blocking(&|| false).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn recv_blocking_returns_none_once_closed_with_nothing_pending() {
        let receiver = Receiver::new();
        let payload = receiver.recv_blocking(&|| true);
        assert!(payload.is_none());
    }
}
