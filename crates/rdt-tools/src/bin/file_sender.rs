//! File-transfer sender driver.
//!
//! Connects to a peer, streams a file in 1024-byte chunks over
//! `rdt-core`, then sends a terminating `EOF` payload and closes. The
//! `EOF` sentinel is an application-level convention of this binary, not
//! part of the reliable-transfer core.

use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use rdt_core::RdtEndpoint;
use rdt_tools::config_args::RdtConfigArgs;
use tracing::info;

const CHUNK_LEN: usize = 1024;

#[derive(Parser, Debug)]
#[command(about = "Send a file over a Go-Back-N RDT connection")]
struct Args {
    #[arg(long, env = "RDT_SERVER_IP")]
    server_ip: String,
    #[arg(long, env = "RDT_SERVER_PORT")]
    server_port: u16,
    #[arg(long, env = "RDT_SEND_FILE")]
    send_file: String,
    #[command(flatten)]
    config: RdtConfigArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let server_addr: SocketAddr = format!("{}:{}", args.server_ip, args.server_port)
        .parse()
        .context("invalid server address")?;

    let endpoint = RdtEndpoint::new("0.0.0.0:0".parse().unwrap(), args.config.into_config())?;
    endpoint.connect(server_addr)?;
    info!(%server_addr, "connected");

    let mut file = File::open(&args.send_file)
        .with_context(|| format!("opening {}", args.send_file))?;
    let mut buf = [0u8; CHUNK_LEN];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        endpoint.send(&buf[..n])?;
    }
    endpoint.send(b"EOF")?;
    endpoint.close();
    info!("transfer complete");
    Ok(())
}
