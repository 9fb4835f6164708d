//! Tunables for the GBN sender/receiver. None of these affect wire
//! compatibility — two endpoints with different `RdtConfig` values still
//! interoperate, they just pace and time out differently.

use std::time::Duration;

/// Margin the endpoint facade reserves below `max_packet_size` when
/// slicing a `send` call into payloads. Fixed by the spec at 20 bytes —
/// independent of [`crate::wire::HEADER_LEN`], which is the codec's
/// actual 9-byte overhead — so this is not "header room", just the
/// slicing boundary the wire contract fixes at `MAX_PACKET_SIZE - 20`.
pub const PAYLOAD_SIZE_MARGIN: usize = 20;

#[derive(Debug, Clone)]
pub struct RdtConfig {
    /// Maximum size of a single UDP datagram this endpoint will emit,
    /// header included.
    pub max_packet_size: usize,
    /// Sliding window size, in packets.
    pub window: u32,
    /// Retransmission timeout: how long the sender waits for forward
    /// progress on the oldest unacked packet before resending the window.
    pub timeout: Duration,
    /// Advisory pacing delay between successive first-time transmissions.
    pub sleep_between_sends: Duration,
}

impl RdtConfig {
    /// Largest payload `send_chunk` may be handed: `max_packet_size -
    /// PAYLOAD_SIZE_MARGIN` (1380 bytes at the default 1400-byte
    /// `max_packet_size`), per the spec's fixed slicing boundary.
    pub fn max_payload_len(&self) -> usize {
        self.max_packet_size - PAYLOAD_SIZE_MARGIN
    }
}

impl Default for RdtConfig {
    fn default() -> Self {
        RdtConfig {
            max_packet_size: 1400,
            window: 4,
            timeout: Duration::from_secs(1),
            sleep_between_sends: Duration::from_millis(2),
        }
    }
}
