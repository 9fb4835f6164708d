//! Go-Back-N sender engine.
//!
//! Owns the sliding window `[send_base, next_seq)`, the retransmission
//! timer, and the send buffer of outstanding packets. `send_chunk`
//! blocks the calling thread while the window is full; `on_ack` and
//! `on_timeout` are invoked from the listener thread and the timer
//! thread respectively.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::RdtConfig;
use crate::error::{RdtError, Result};
use crate::socket::DatagramSocket;
use crate::timer::{RetransmitTimer, TimerHandle};
use crate::wire::Packet;

struct SenderState {
    send_base: u32,
    next_seq: u32,
    /// Wire bytes of every packet in `[send_base, next_seq)`, keyed by
    /// sequence number.
    buffer: BTreeMap<u32, Vec<u8>>,
}

struct SenderCore {
    state: Mutex<SenderState>,
    window_available: Condvar,
    socket: Arc<DatagramSocket>,
    peer: SocketAddr,
    config: RdtConfig,
}

impl SenderCore {
    fn retransmit_window(&self, handle: &TimerHandle) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.buffer.is_empty() {
            // Window drained (e.g. by a concurrent ACK) between the
            // timer firing and this callback taking the lock.
            return;
        }
        let count = state.buffer.len();
        debug!(
            send_base = state.send_base,
            next_seq = state.next_seq,
            count,
            "retransmitting outstanding window"
        );
        for bytes in state.buffer.values() {
            self.socket.send_to(self.peer, bytes);
        }
        handle.arm(self.config.timeout);
    }
}

pub struct Sender {
    core: Arc<SenderCore>,
    timer: RetransmitTimer,
}

impl Sender {
    pub fn new(socket: Arc<DatagramSocket>, peer: SocketAddr, config: RdtConfig) -> Self {
        let core = Arc::new(SenderCore {
            state: Mutex::new(SenderState {
                send_base: 0,
                next_seq: 0,
                buffer: BTreeMap::new(),
            }),
            window_available: Condvar::new(),
            socket,
            peer,
            config,
        });

        let timer_core = core.clone();
        let timer = RetransmitTimer::new(move |handle| timer_core.retransmit_window(handle));

        Sender { core, timer }
    }

    /// Submits a single payload for reliable delivery. Blocks while the
    /// window is full. `payload` must be at most
    /// `config.max_payload_len()` bytes.
    pub fn send_chunk(&self, payload: Bytes) -> Result<()> {
        let max_len = self.core.config.max_payload_len();
        if payload.len() > max_len {
            debug_assert!(
                false,
                "endpoint::send must slice payloads to max_payload_len before calling send_chunk"
            );
            return Err(RdtError::PayloadTooLarge {
                len: payload.len(),
                max: max_len,
            });
        }

        let seq;
        let encoded;
        {
            let mut state = self.core.state.lock().unwrap_or_else(|e| e.into_inner());
            while state.next_seq - state.send_base >= self.core.config.window {
                state = self
                    .core
                    .window_available
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner());
            }
            seq = state.next_seq;
            let packet = Packet::data(seq, payload);
            encoded = packet.encode().to_vec();
            state.buffer.insert(seq, encoded.clone());
            state.next_seq += 1;
        }

        trace!(seq, "transmitting data packet");
        self.core.socket.send_to(self.core.peer, &encoded);

        {
            let state = self.core.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.send_base == seq {
                self.timer.arm(self.core.config.timeout);
            }
        }

        std::thread::sleep(self.core.config.sleep_between_sends);
        Ok(())
    }

    /// Applies a cumulative ACK for `ack_seq`, advancing `send_base` and
    /// pruning the send buffer. Stale ACKs (`ack_seq < send_base`) are
    /// ignored.
    pub fn on_ack(&self, ack_seq: u32) {
        let mut state = self.core.state.lock().unwrap_or_else(|e| e.into_inner());
        if ack_seq < state.send_base {
            trace!(ack_seq, send_base = state.send_base, "stale ack ignored");
            return;
        }

        let new_base = ack_seq + 1;
        state.buffer.retain(|&seq, _| seq >= new_base);
        state.send_base = new_base;

        if state.send_base == state.next_seq {
            self.timer.cancel();
        } else {
            self.timer.arm(self.core.config.timeout);
        }
        self.core.window_available.notify_all();
    }

    pub fn send_base(&self) -> u32 {
        self.core.state.lock().unwrap_or_else(|e| e.into_inner()).send_base
    }

    pub fn next_seq(&self) -> u32 {
        self.core.state.lock().unwrap_or_else(|e| e.into_inner()).next_seq
    }

    pub fn in_flight(&self) -> u32 {
        let state = self.core.state.lock().unwrap_or_else(|e| e.into_inner());
        state.next_seq - state.send_base
    }

    /// Cancels and joins the retransmission timer thread. Called by the
    /// endpoint facade's `close()` so no retransmission fires after an
    /// endpoint reports itself closed.
    pub fn shutdown(&self) {
        self.timer.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn local_pair() -> (Arc<DatagramSocket>, Arc<DatagramSocket>) {
        let a = Arc::new(DatagramSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        let b = Arc::new(DatagramSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        (a, b)
    }

    fn test_config() -> RdtConfig {
        RdtConfig {
            window: 2,
            timeout: Duration::from_millis(50),
            sleep_between_sends: Duration::from_millis(0),
            ..RdtConfig::default()
        }
    }

    #[test]
    fn send_chunk_transmits_and_fills_window() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Sender::new(sock, peer_addr, test_config());

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        assert_eq!(sender.next_seq(), 1);
        assert_eq!(sender.in_flight(), 1);

        let (bytes, _) = peer_sock.recv().unwrap().unwrap();
        let pkt = Packet::decode(Bytes::from(bytes)).unwrap();
        assert_eq!(pkt.seq, 0);
        assert_eq!(&pkt.payload[..], b"a");
    }

    #[test]
    fn ack_advances_send_base_and_prunes_buffer() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Sender::new(sock, peer_addr, test_config());

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        sender.send_chunk(Bytes::from_static(b"b")).unwrap();
        assert_eq!(sender.in_flight(), 2);

        sender.on_ack(0);
        assert_eq!(sender.send_base(), 1);
        assert_eq!(sender.in_flight(), 1);
    }

    #[test]
    fn stale_ack_is_ignored() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Sender::new(sock, peer_addr, test_config());

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        sender.on_ack(0);
        sender.on_ack(0);
        sender.on_ack(0);
        assert_eq!(sender.send_base(), 1);
    }

    #[test]
    fn full_window_blocks_until_ack() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Arc::new(Sender::new(sock, peer_addr, test_config()));

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        sender.send_chunk(Bytes::from_static(b"b")).unwrap();
        assert_eq!(sender.in_flight(), 2);

        let sender_clone = sender.clone();
        let unblocker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            sender_clone.on_ack(0);
        });
        sender.send_chunk(Bytes::from_static(b"c")).unwrap();
        unblocker.join().unwrap();
        assert_eq!(sender.next_seq(), 3);
    }

    #[test]
    fn timeout_retransmits_whole_window() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Sender::new(sock, peer_addr, test_config());

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        sender.send_chunk(Bytes::from_static(b"b")).unwrap();

        // Drain the two first-transmission datagrams.
        peer_sock.recv().unwrap().unwrap();
        peer_sock.recv().unwrap().unwrap();

        // Timeout (50ms) should retransmit both outstanding packets.
        let (first, _) = peer_sock.recv().unwrap().unwrap();
        let (second, _) = peer_sock.recv().unwrap().unwrap();
        let first = Packet::decode(Bytes::from(first)).unwrap();
        let second = Packet::decode(Bytes::from(second)).unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
    }

    #[test]
    fn shutdown_joins_timer_and_stops_retransmissions() {
        let sock = Arc::new(DatagramSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        let peer_sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        peer_sock
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let peer_addr = peer_sock.local_addr().unwrap();
        let sender = Sender::new(sock, peer_addr, test_config());

        sender.send_chunk(Bytes::from_static(b"a")).unwrap();
        let mut buf = [0u8; 64];
        peer_sock.recv_from(&mut buf).unwrap(); // drain the first transmission

        sender.shutdown();

        // Past several retransmission intervals (50ms in test_config).
        std::thread::sleep(Duration::from_millis(200));
        assert!(
            peer_sock.recv_from(&mut buf).is_err(),
            "retransmission fired after shutdown"
        );
    }

    #[test]
    fn oversized_payload_rejected() {
        let (sock, peer_sock) = local_pair();
        let peer_addr = peer_sock.local_addr().unwrap();
        let config = RdtConfig {
            max_packet_size: 20,
            ..test_config()
        };
        let sender = Sender::new(sock, peer_addr, config);
        let oversized = Bytes::from(vec![0u8; 100]);
        let err = sender.send_chunk(oversized).unwrap_err();
        assert!(matches!(err, RdtError::PayloadTooLarge { .. }));
    }
}
