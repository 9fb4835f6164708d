//! # RDT Wire Format
//!
//! Fixed 9-byte header, no versioning, no length field — the datagram
//! boundary is authoritative.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Sequence Number (32)                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  ACK  |                  CRC32 (24 of 32 bits shown)           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            ...CRC32 (cont.)          |         Payload...     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! CRC32 is the standard IEEE 802.3 polynomial (the same one `zlib.crc32`
//! computes), taken over the 5 header bytes preceding it plus the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Header length: 4 (sequence) + 1 (ack flag) + 4 (crc32).
pub const HEADER_LEN: usize = 9;

const ACK_FLAG_DATA: u8 = 0x00;
const ACK_FLAG_ACK: u8 = 0x01;

/// A decoded packet: sequence number, ACK/data discriminant, and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq: u32,
    pub is_ack: bool,
    pub payload: Bytes,
}

impl Packet {
    pub fn data(seq: u32, payload: Bytes) -> Self {
        Packet {
            seq,
            is_ack: false,
            payload,
        }
    }

    pub fn ack(seq: u32) -> Self {
        Packet {
            seq,
            is_ack: true,
            payload: Bytes::new(),
        }
    }

    /// Serialize to wire bytes, computing and appending the CRC32.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u32(self.seq);
        buf.put_u8(if self.is_ack { ACK_FLAG_ACK } else { ACK_FLAG_DATA });
        let crc = compute_crc(self.seq, self.is_ack, &self.payload);
        buf.put_u32(crc);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse and integrity-check wire bytes in one step. Frames shorter
    /// than [`HEADER_LEN`] or whose CRC32 does not match are rejected
    /// uniformly as [`DecodeError::InvalidFrame`] — a corrupted header is
    /// indistinguishable from a corrupted payload to the caller.
    pub fn decode(mut buf: impl Buf) -> Result<Self, DecodeError> {
        if buf.remaining() < HEADER_LEN {
            return Err(DecodeError::InvalidFrame);
        }
        let seq = buf.get_u32();
        let ack_flag = buf.get_u8();
        let claimed_crc = buf.get_u32();
        let payload = buf.copy_to_bytes(buf.remaining());
        let is_ack = ack_flag != ACK_FLAG_DATA;

        if compute_crc(seq, is_ack, &payload) != claimed_crc {
            return Err(DecodeError::InvalidFrame);
        }
        Ok(Packet {
            seq,
            is_ack,
            payload,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidFrame,
}

fn compute_crc(seq: u32, is_ack: bool, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&seq.to_be_bytes());
    hasher.update(&[if is_ack { ACK_FLAG_ACK } else { ACK_FLAG_DATA }]);
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_roundtrip() {
        let pkt = Packet::data(7, Bytes::from_static(b"hello"));
        let encoded = pkt.encode();
        let decoded = Packet::decode(encoded.freeze()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn ack_packet_roundtrip() {
        let pkt = Packet::ack(42);
        let encoded = pkt.encode();
        let decoded = Packet::decode(encoded.freeze()).unwrap();
        assert!(decoded.is_ack);
        assert_eq!(decoded.seq, 42);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn empty_payload_roundtrip() {
        let pkt = Packet::data(0, Bytes::new());
        let encoded = pkt.encode();
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = Packet::decode(encoded.freeze()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn short_frame_is_invalid() {
        let buf = Bytes::from_static(b"short");
        assert_eq!(Packet::decode(buf), Err(DecodeError::InvalidFrame));
    }

    #[test]
    fn corrupted_byte_fails_crc() {
        let pkt = Packet::data(1, Bytes::from_static(b"payload"));
        let mut encoded = pkt.encode();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert_eq!(
            Packet::decode(encoded.freeze()),
            Err(DecodeError::InvalidFrame)
        );
    }

    #[test]
    fn corrupted_header_fails_crc() {
        let pkt = Packet::data(1, Bytes::from_static(b"payload"));
        let mut encoded = pkt.encode();
        encoded[0] ^= 0xFF;
        assert_eq!(
            Packet::decode(encoded.freeze()),
            Err(DecodeError::InvalidFrame)
        );
    }

    #[test]
    fn crc_matches_zlib_polynomial() {
        // IEEE 802.3 CRC32 of b"123456789" is the well-known check value.
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(b"123456789");
        assert_eq!(hasher.finalize(), 0xCBF4_3926);
    }
}
