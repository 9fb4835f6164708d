//! Network impairment simulator.
//!
//! Sits between two `rdt-core` endpoints and forwards datagrams in both
//! directions, independently dropping, single-byte-corrupting, or
//! diverting each one to a reorder buffer for later out-of-order
//! release. Entirely external to the reliability core: the core must
//! tolerate whatever this binary does to the traffic passing through it.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use tracing::{debug, info};

#[derive(Parser, Debug, Clone)]
#[command(about = "Randomly drop, corrupt, and reorder datagrams between two RDT endpoints")]
struct Args {
    /// Address endpoint A sends its traffic to (this simulator's A-facing port).
    #[arg(long, env = "RDT_SIM_LISTEN_A")]
    listen_a: SocketAddr,
    /// Address endpoint B sends its traffic to (this simulator's B-facing port).
    #[arg(long, env = "RDT_SIM_LISTEN_B")]
    listen_b: SocketAddr,
    /// Endpoint A's real address, used to forward B's traffic to it.
    #[arg(long, env = "RDT_SIM_ADDR_A")]
    addr_a: SocketAddr,
    /// Endpoint B's real address, used to forward A's traffic to it.
    #[arg(long, env = "RDT_SIM_ADDR_B")]
    addr_b: SocketAddr,
    #[arg(long, env = "RDT_SIM_DROP_PROB", default_value_t = 0.1)]
    drop_prob: f64,
    #[arg(long, env = "RDT_SIM_CORRUPT_PROB", default_value_t = 0.1)]
    corrupt_prob: f64,
    #[arg(long, env = "RDT_SIM_REORDER_PROB", default_value_t = 0.1)]
    reorder_prob: f64,
}

#[derive(Clone, Copy)]
enum Direction {
    AtoB,
    BtoA,
}

struct HeldDatagram {
    direction: Direction,
    data: Vec<u8>,
}

fn corrupt_one_byte(data: &mut [u8]) {
    if data.is_empty() {
        return;
    }
    let mut rng = rand::rng();
    let idx = rng.random_range(0..data.len());
    data[idx] ^= 0xFF;
}

fn forward_loop(
    in_socket: Arc<UdpSocket>,
    out_socket: Arc<UdpSocket>,
    out_addr: SocketAddr,
    direction: Direction,
    args: Args,
    reorder_buffer: Arc<Mutex<Vec<HeldDatagram>>>,
) {
    let mut buf = [0u8; 2048];
    loop {
        let (len, _src) = match in_socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(_) => continue,
        };
        let mut data = buf[..len].to_vec();
        let mut rng = rand::rng();

        if rng.random::<f64>() < args.drop_prob {
            debug!("dropped datagram");
            continue;
        }
        if rng.random::<f64>() < args.corrupt_prob {
            corrupt_one_byte(&mut data);
            debug!("corrupted datagram");
        }
        if rng.random::<f64>() < args.reorder_prob {
            debug!("diverted datagram to reorder buffer");
            reorder_buffer
                .lock()
                .unwrap()
                .push(HeldDatagram { direction, data });
            continue;
        }
        let _ = out_socket.send_to(&data, out_addr);
    }
}

/// Periodically releases a random entry from the reorder buffer, the
/// same way the reference simulator's main loop does.
fn reorder_release_loop(
    socket_to_a: Arc<UdpSocket>,
    addr_a: SocketAddr,
    socket_to_b: Arc<UdpSocket>,
    addr_b: SocketAddr,
    reorder_buffer: Arc<Mutex<Vec<HeldDatagram>>>,
) {
    loop {
        thread::sleep(Duration::from_millis(50));
        let mut rng = rand::rng();
        if rng.random::<f64>() >= 0.2 {
            continue;
        }
        let held = {
            let mut buffer = reorder_buffer.lock().unwrap();
            if buffer.is_empty() {
                continue;
            }
            let idx = rng.random_range(0..buffer.len());
            buffer.remove(idx)
        };
        match held.direction {
            Direction::AtoB => {
                let _ = socket_to_b.send_to(&held.data, addr_b);
            }
            Direction::BtoA => {
                let _ = socket_to_a.send_to(&held.data, addr_a);
            }
        }
        debug!("released reordered datagram");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let socket_a = Arc::new(UdpSocket::bind(args.listen_a)?);
    let socket_b = Arc::new(UdpSocket::bind(args.listen_b)?);
    let reorder_buffer: Arc<Mutex<Vec<HeldDatagram>>> = Arc::new(Mutex::new(Vec::new()));

    info!(
        listen_a = %args.listen_a,
        listen_b = %args.listen_b,
        drop_prob = args.drop_prob,
        corrupt_prob = args.corrupt_prob,
        reorder_prob = args.reorder_prob,
        "network simulator running"
    );

    let a_to_b = {
        let socket_a = socket_a.clone();
        let socket_b = socket_b.clone();
        let args = args.clone();
        let reorder_buffer = reorder_buffer.clone();
        thread::spawn(move || {
            forward_loop(
                socket_a,
                socket_b,
                args.addr_b,
                Direction::AtoB,
                args,
                reorder_buffer,
            )
        })
    };

    let b_to_a = {
        let socket_a = socket_a.clone();
        let socket_b = socket_b.clone();
        let args = args.clone();
        let reorder_buffer = reorder_buffer.clone();
        thread::spawn(move || {
            forward_loop(
                socket_b,
                socket_a,
                args.addr_a,
                Direction::BtoA,
                args,
                reorder_buffer,
            )
        })
    };

    let (addr_a, addr_b) = (args.addr_a, args.addr_b);
    let releaser = thread::spawn(move || {
        reorder_release_loop(socket_a, addr_a, socket_b, addr_b, reorder_buffer)
    });

    a_to_b.join().expect("a-to-b forwarder panicked");
    b_to_a.join().expect("b-to-a forwarder panicked");
    releaser.join().expect("reorder releaser panicked");
    Ok(())
}
