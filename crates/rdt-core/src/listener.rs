//! Background listener: the one thread per endpoint that ever reads from
//! the datagram socket. Everything else (ACK dispatch, data dispatch,
//! ACK emission) happens inline on this thread so the sender/receiver
//! engines never need to poll the socket themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use tracing::trace;

use crate::peer::PeerSlot;
use crate::receiver::{send_ack, Receiver};
use crate::sender::Sender;
use crate::socket::DatagramSocket;
use crate::wire::Packet;

pub fn spawn(
    socket: Arc<DatagramSocket>,
    peer: Arc<PeerSlot>,
    sender: Arc<Mutex<Option<Arc<Sender>>>>,
    receiver: Arc<Receiver>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("rdt-listener".into())
        .spawn(move || run(socket, peer, sender, receiver, running))
        .expect("failed to spawn rdt listener thread")
}

fn run(
    socket: Arc<DatagramSocket>,
    peer: Arc<PeerSlot>,
    sender: Arc<Mutex<Option<Arc<Sender>>>>,
    receiver: Arc<Receiver>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        let datagram = match socket.recv() {
            Ok(Some(datagram)) => datagram,
            Ok(None) => break,
            Err(err) => {
                trace!(%err, "datagram read failed, continuing");
                continue;
            }
        };
        let (bytes, source) = datagram;

        // Recorded before integrity verification: `accept()` unblocks on
        // the first datagram observed from a peer, valid or not.
        peer.try_set(source);

        let packet = match Packet::decode(Bytes::from(bytes)) {
            Ok(packet) => packet,
            Err(_) => {
                trace!("discarding malformed or corrupt datagram");
                continue;
            }
        };

        if packet.is_ack {
            let guard = sender.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(sender) = guard.as_ref() {
                sender.on_ack(packet.seq);
            }
        } else if let Some(ack_seq) = receiver.on_data(packet.seq, packet.payload) {
            if let Some(peer_addr) = peer.get() {
                send_ack(&socket, peer_addr, ack_seq);
            }
        }
    }
}
