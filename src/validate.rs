//! Integrity checks for a received `sipa.bin` blob.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. the buffer holds the whole fixed header,
//! 2. the declared size fits in the buffer (trailing bytes only warn),
//! 3. the version matches exactly,
//! 4. the CRC-32 over `[version .. declared end)` matches the stored one.

use core::fmt;

use crate::crc::calculate_crc32;
use crate::param::Param;
use crate::schema::{read_u32, CRC_OFFSET, DATA_SIZE_OFFSET, FW_HEADER_SIZE, VERSION_OFFSET};

/// Blob rejection reason.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Buffer is shorter than the fixed header.
    TooShortForHeader { len: usize, header_size: usize },
    /// Header plus declared data size is larger than the buffer.
    DeclaredSizeExceedsBuffer { declared: usize, len: usize },
    /// Header version differs from the accepted one.
    VersionMismatch { expected: u32, actual: u32 },
    /// Stored CRC does not match the payload.
    ChecksumFailed { stored: u32, computed: u32 },
    /// Could not allocate the image.
    AllocFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShortForHeader { len, header_size } => {
                write!(f, "blob too short: {} < header size {}", len, header_size)
            }
            Self::DeclaredSizeExceedsBuffer { declared, len } => {
                write!(f, "declared size {} exceeds blob size {}", declared, len)
            }
            Self::VersionMismatch { expected, actual } => {
                write!(f, "version 0x{:08x} != expected 0x{:08x}", actual, expected)
            }
            Self::ChecksumFailed { stored, computed } => {
                write!(f, "crc 0x{:08x} != computed 0x{:08x}", stored, computed)
            }
            Self::AllocFailed => write!(f, "image allocation failed"),
        }
    }
}

impl core::error::Error for Error {}

/// Non-fatal finding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Warning {
    /// The blob is longer than declared; the excess is producer padding and is dropped.
    SizeMismatch { declared: usize, len: usize },
}

/// A blob that passed every check.
#[derive(Debug)]
pub struct Validated {
    pub param: Param,
    pub warning: Option<Warning>,
}

/// Validate `fw` and copy it into an owned [`Param`].
///
/// `version` is the only header version accepted.
pub fn validate(fw: &[u8], version: u32) -> Result<Validated, Error> {
    let len = fw.len();
    if len < FW_HEADER_SIZE {
        error!("blob too short: {} < header size {}", len, FW_HEADER_SIZE);
        return Err(Error::TooShortForHeader {
            len,
            header_size: FW_HEADER_SIZE,
        });
    }

    let data_size = read_u32(fw, DATA_SIZE_OFFSET) as usize;
    let declared = FW_HEADER_SIZE.saturating_add(data_size);
    if declared > len {
        error!("declared size {} > blob size {}", declared, len);
        return Err(Error::DeclaredSizeExceedsBuffer { declared, len });
    }

    let warning = if declared < len {
        warn!("declared size {} < blob size {}", declared, len);
        Some(Warning::SizeMismatch { declared, len })
    } else {
        None
    };

    let actual = read_u32(fw, VERSION_OFFSET);
    if actual != version {
        error!(
            "version mismatch: expected 0x{:08x}, got 0x{:08x}",
            version, actual
        );
        return Err(Error::VersionMismatch {
            expected: version,
            actual,
        });
    }

    let stored = read_u32(fw, CRC_OFFSET);
    let computed = calculate_crc32(&fw[VERSION_OFFSET..declared]);
    if stored != computed {
        error!("crc 0x{:08x} check failed (computed 0x{:08x})", stored, computed);
        return Err(Error::ChecksumFailed { stored, computed });
    }

    let param = Param::copy_from(&fw[..declared]).ok_or_else(|| {
        error!("image allocation failed ({} bytes)", declared);
        Error::AllocFailed
    })?;

    Ok(Validated { param, warning })
}
