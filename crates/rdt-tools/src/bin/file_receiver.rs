//! File-transfer receiver driver.
//!
//! Accepts a single peer, writes delivered payloads to a file as they
//! arrive, and stops at the first payload that is exactly the
//! three-byte value `EOF` — a convention of this binary, not something
//! `rdt-core` itself interprets.

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use rdt_core::RdtEndpoint;
use rdt_tools::config_args::RdtConfigArgs;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Receive a file over a Go-Back-N RDT connection")]
struct Args {
    #[arg(long, env = "RDT_PORT")]
    port: u16,
    #[arg(long, env = "RDT_SAVE_FILE")]
    save_file: String,
    #[command(flatten)]
    config: RdtConfigArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let local_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse().unwrap();

    let endpoint = RdtEndpoint::new(local_addr, args.config.into_config())?;
    let peer = endpoint.accept()?;
    info!(%peer, "accepted");

    let mut file =
        File::create(&args.save_file).with_context(|| format!("creating {}", args.save_file))?;
    loop {
        let payload = endpoint.recv()?;
        if &payload[..] == b"EOF" {
            break;
        }
        file.write_all(&payload)?;
    }
    endpoint.close();
    info!(save_file = %args.save_file, "transfer complete");
    Ok(())
}
