//! Frame encoding and decoding for the droid wire protocol.
//!
//! Frame format:
//! - HEADER (1 byte): `opcode << 1`, low bit carries bit 8 of the payload length
//! - LENGTH (1 byte): low 8 bits of the payload length
//! - PAYLOAD (0-511 bytes): command specific data
//! - CHECKSUM (2 bytes): CRC-16 of PAYLOAD only, high byte first

use thiserror::Error;

use super::checksum::{checksum, checksum_bytes};

/// Largest payload the 9-bit length field can describe
pub const MAX_PAYLOAD_SIZE: usize = 0x1FF;

/// Largest opcode that fits in the header after the shift
pub const MAX_OPCODE: u8 = 0x7F;

/// Header byte of inbound telemetry frames
pub const TELEMETRY_HEADER: u8 = 24;

/// Opcode carried by inbound telemetry frames (`TELEMETRY_HEADER >> 1`)
pub const TELEMETRY_OPCODE: u8 = TELEMETRY_HEADER >> 1;

/// Shortest acceptable telemetry frame: header, length, one payload byte, checksum
pub const MIN_TELEMETRY_SIZE: usize = 5;

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Payload of {0} bytes exceeds the 511 byte limit")]
    PayloadTooLarge(usize),
    #[error("Opcode {0} does not fit in the frame header")]
    OpcodeOutOfRange(u8),
    #[error("Frame of {0} bytes is too short")]
    TooShort(usize),
    #[error("Unexpected frame header {0}")]
    UnexpectedHeader(u8),
    #[error("Checksum mismatch: expected {expected:#06x}, received {received:#06x}")]
    ChecksumMismatch { expected: u16, received: u16 },
}

/// A command or telemetry frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given opcode and payload
    pub fn new(opcode: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if opcode > MAX_OPCODE {
            return Err(FrameError::OpcodeOutOfRange(opcode));
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }
        Ok(Self {
            opcode,
            payload: payload.to_vec(),
        })
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// CRC-16 over the payload alone
    pub fn checksum(&self) -> u16 {
        checksum(&self.payload)
    }

    /// Encode this frame into its wire representation
    pub fn encode(&self) -> Vec<u8> {
        let n = self.payload.len();
        let mut buffer = Vec::with_capacity(n + 4);
        buffer.push((self.opcode << 1) | ((n >> 8) & 1) as u8);
        buffer.push((n & 0xFF) as u8);
        buffer.extend_from_slice(&self.payload);
        buffer.extend_from_slice(&checksum_bytes(self.checksum()));
        buffer
    }
}

/// Build the wire bytes for `opcode` carrying `payload`.
pub fn encode(opcode: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    Ok(Frame::new(opcode, payload)?.encode())
}

/// Parse an inbound telemetry frame.
///
/// Only frames whose header is [`TELEMETRY_HEADER`] and whose trailer matches
/// the payload checksum are accepted. The length byte is not cross-checked;
/// the payload is everything between the two header bytes and the trailer.
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < MIN_TELEMETRY_SIZE {
        return Err(FrameError::TooShort(bytes.len()));
    }
    if bytes[0] != TELEMETRY_HEADER {
        return Err(FrameError::UnexpectedHeader(bytes[0]));
    }

    let trailer = bytes.len() - 2;
    let payload = &bytes[2..trailer];
    let expected = checksum(payload);
    let received = u16::from_be_bytes([bytes[trailer], bytes[trailer + 1]]);
    if expected != received {
        return Err(FrameError::ChecksumMismatch { expected, received });
    }

    Ok(Frame {
        opcode: TELEMETRY_OPCODE,
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = encode(10, &[2, 191]).unwrap();
        let crc = checksum(&[2, 191]);

        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[0], 20);
        assert_eq!(bytes[1], 2);
        assert_eq!(&bytes[2..4], &[2, 191]);
        assert_eq!(bytes[4], (crc >> 8) as u8);
        assert_eq!(bytes[5], (crc & 0xFF) as u8);
    }

    #[test]
    fn test_encode_empty_payload() {
        let bytes = encode(9, &[]).unwrap();
        assert_eq!(bytes, vec![18, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_ninth_length_bit() {
        let payload = vec![0u8; 300];
        let bytes = encode(15, &payload).unwrap();

        assert_eq!(bytes.len(), 304);
        assert_eq!(bytes[0], (15 << 1) | 1);
        assert_eq!(bytes[1], (300 & 0xFF) as u8);
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert_eq!(encode(128, &[]), Err(FrameError::OpcodeOutOfRange(128)));
        assert_eq!(
            encode(1, &vec![0u8; 512]),
            Err(FrameError::PayloadTooLarge(512))
        );
    }

    #[test]
    fn test_checksum_ignores_header() {
        let a = Frame::new(9, &[1, 2, 3]).unwrap();
        let b = Frame::new(15, &[1, 2, 3]).unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.checksum(), checksum(&[1, 2, 3]));
    }

    #[test]
    fn test_decode_accepts_only_telemetry() {
        let payload: Vec<u8> = (0..=249).collect();
        for opcode in 0..=MAX_OPCODE {
            for len in [1usize, 2, 3, 17, 250] {
                let bytes = encode(opcode, &payload[..len]).unwrap();
                let decoded = decode(&bytes);
                if opcode == TELEMETRY_OPCODE {
                    let frame = decoded.unwrap();
                    assert_eq!(frame.opcode(), TELEMETRY_OPCODE);
                    assert_eq!(frame.payload(), &payload[..len]);
                } else {
                    assert_eq!(decoded, Err(FrameError::UnexpectedHeader(opcode << 1)));
                }
            }
        }
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(decode(&[24, 0, 0xFF, 0xFF]), Err(FrameError::TooShort(4)));
        assert_eq!(decode(&[]), Err(FrameError::TooShort(0)));
    }

    #[test]
    fn test_decode_corrupted_trailer() {
        let mut bytes = encode(TELEMETRY_OPCODE, &[0, 150]).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            decode(&bytes),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_corrupted_payload() {
        let mut bytes = encode(TELEMETRY_OPCODE, &[7, 200]).unwrap();
        bytes[3] = 201;
        assert!(matches!(
            decode(&bytes),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }
}
