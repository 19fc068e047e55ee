//! CRC-32 used by the `sipa.bin` header.

use ::crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32/ISO-HDLC (polynomial 0x04C11DB7, reflected, init and xorout 0xFFFFFFFF).
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Calculate the CRC-32 of `data`.
pub fn calculate_crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
