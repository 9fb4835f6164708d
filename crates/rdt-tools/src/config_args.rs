//! `RdtConfig` tunables as a flattened `clap` argument group, so every
//! binary accepts the same flags and falls back to the same environment
//! variables before reaching for `RdtConfig::default()`.

use std::time::Duration;

use clap::Args;
use rdt_core::RdtConfig;

#[derive(Args, Debug, Clone)]
pub struct RdtConfigArgs {
    /// Sliding window size, in packets.
    #[arg(long, env = "RDT_WINDOW", default_value_t = RdtConfig::default().window)]
    pub window: u32,

    /// Retransmission timeout, in milliseconds.
    #[arg(long, env = "RDT_TIMEOUT_MS", default_value_t = RdtConfig::default().timeout.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Advisory pacing delay between first-time transmissions, in milliseconds.
    #[arg(long, env = "RDT_SLEEP_BETWEEN_SENDS_MS", default_value_t = RdtConfig::default().sleep_between_sends.as_millis() as u64)]
    pub sleep_between_sends_ms: u64,

    /// Largest UDP datagram this endpoint will emit, header included.
    #[arg(long, env = "RDT_MAX_PACKET_SIZE", default_value_t = RdtConfig::default().max_packet_size)]
    pub max_packet_size: usize,
}

impl RdtConfigArgs {
    pub fn into_config(self) -> RdtConfig {
        RdtConfig {
            max_packet_size: self.max_packet_size,
            window: self.window,
            timeout: Duration::from_millis(self.timeout_ms),
            sleep_between_sends: Duration::from_millis(self.sleep_between_sends_ms),
        }
    }
}
