//! # rdt-core
//!
//! A Go-Back-N reliable-data-transfer endpoint over unreliable UDP
//! datagrams.
//!
//! ## Crate structure
//!
//! - [`wire`] — fixed 9-byte packet header, CRC32 integrity check
//! - [`socket`] — datagram I/O facade with a closeable blocking `recv`
//! - [`sender`] — GBN sender engine: sliding window, send buffer, retransmit
//! - [`receiver`] — GBN receiver engine: in-order delivery, cumulative ACKs
//! - [`listener`] — background thread dispatching inbound datagrams
//! - [`timer`] — cancellable, re-armable one-shot retransmission timer
//! - [`peer`] — the single remote address an endpoint talks to
//! - [`endpoint`] — public façade: connect/accept/send/recv/close
//! - [`config`] — tunables (window size, timeout, pacing, packet size)
//! - [`error`] — error taxonomy

pub mod config;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod peer;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod timer;
pub mod wire;

pub use config::RdtConfig;
pub use endpoint::RdtEndpoint;
pub use error::{RdtError, Result};
