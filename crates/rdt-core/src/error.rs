//! Error taxonomy for the RDT endpoint.
//!
//! Lifecycle and usage mistakes (`NotConnected`, `AlreadyConnected`, `Closed`)
//! are surfaced to callers. Transport-layer faults (`InvalidFrame`,
//! `DatagramIo`) are recovered by the protocol itself and only ever logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RdtError {
    #[error("endpoint has no connected peer")]
    NotConnected,

    #[error("endpoint is already connected to a peer")]
    AlreadyConnected,

    #[error("endpoint is closed")]
    Closed,

    #[error("received frame is malformed or failed integrity check")]
    InvalidFrame,

    #[error("datagram I/O error: {0}")]
    DatagramIo(#[from] std::io::Error),

    #[error("payload of {len} bytes exceeds the {max}-byte per-packet limit")]
    PayloadTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, RdtError>;
