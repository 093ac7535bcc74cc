//! CRC-16 checksum for droid frames.
//!
//! CRC-16/IBM-3740 (polynomial 0x1021, initial register 0xFFFF, MSB first,
//! no reflection, no final XOR). The control hub firmware rejects any frame
//! whose trailer does not match, so this must stay bit-exact.

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16 calculator with 256-entry lookup table.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Calculate the CRC-16 checksum of a frame payload.
#[inline]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Split a checksum into the (high, low) trailer bytes.
#[inline]
#[must_use]
pub fn checksum_bytes(crc: u16) -> [u8; 2] {
    crc.to_be_bytes()
}
