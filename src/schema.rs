//! `sipa.bin` container layout.
//!
//! All integers are little-endian and the fixed part carries no padding:
//!
//! ```text
//! 0               crc        u32    CRC-32 over [4 .. FW_HEADER_SIZE + data_size)
//! 4               version    u32
//! 8               data_size  u32    length of the trailing data region
//! 12              ch_en      u8        x CHANNEL_NUM
//! CHIP_CFG_OFFSET chip_cfg   ParamList x CHANNEL_NUM
//! EXTRA_CFG_OFFSET extra_cfg ExtraCfg  x CHANNEL_NUM
//! FW_HEADER_SIZE  data       data_size bytes, addressed by ParamList offsets
//! ```

/// Number of amplifier channels described by one blob.
pub const CHANNEL_NUM: usize = 2;

/// Header version accepted by default.
pub const FW_VERSION: u32 = 0x0001_0002;

/// `ch_en` value marking a channel as enabled. Anything else is disabled.
pub const CHANNEL_ENABLED: u8 = 1;

pub(crate) const CRC_OFFSET: usize = 0;
pub(crate) const VERSION_OFFSET: usize = 4;
pub(crate) const DATA_SIZE_OFFSET: usize = 8;
pub(crate) const CH_EN_OFFSET: usize = 12;
pub(crate) const CHIP_CFG_OFFSET: usize = CH_EN_OFFSET + CHANNEL_NUM;
pub(crate) const EXTRA_CFG_OFFSET: usize = CHIP_CFG_OFFSET + CHANNEL_NUM * ParamList::SIZE;

/// Size of the fixed part of the blob, i.e. everything before the data region.
pub const FW_HEADER_SIZE: usize = EXTRA_CFG_OFFSET + CHANNEL_NUM * ExtraCfg::SIZE;

/// A fixed-size record stored in the blob.
pub trait Record: Sized {
    /// Encoded size in bytes. Must match the producer's `node_size`.
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Self;
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Descriptor of a run of `num` records of `node_size` bytes, `offset` bytes
/// into the data region.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamList {
    pub node_size: u32,
    pub offset: u32,
    pub num: u32,
}

impl Record for ParamList {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            node_size: read_u32(bytes, 0),
            offset: read_u32(bytes, 4),
            num: read_u32(bytes, 8),
        }
    }
}

/// Per-chip configuration.
///
/// The nested lists address [`RegNode`] sequences in the same data region and
/// are resolved through [`ParamData::list`](crate::ParamData::list).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipCfg {
    pub chip_type: u32,
    /// Register writes applied once after power-up.
    pub init: ParamList,
    /// Register writes applied when the stream starts.
    pub startup: ParamList,
    /// Register writes applied when the stream stops.
    pub shutdown: ParamList,
}

impl Record for ChipCfg {
    const SIZE: usize = 4 + 3 * ParamList::SIZE;

    fn decode(bytes: &[u8]) -> Self {
        let list = |n: usize| {
            let at = 4 + n * ParamList::SIZE;
            ParamList::decode(&bytes[at..at + ParamList::SIZE])
        };

        Self {
            chip_type: read_u32(bytes, 0),
            init: list(0),
            startup: list(1),
            shutdown: list(2),
        }
    }
}

/// A single register write.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegNode {
    pub addr: u32,
    pub val: u32,
}

impl Record for RegNode {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            addr: read_u32(bytes, 0),
            val: read_u32(bytes, 4),
        }
    }
}

/// Speaker resistance limits bounding calibration, in milliohm.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtraCfg {
    pub spk_min_r0: u32,
    pub spk_max_r0: u32,
    pub spk_max_delta_r0: u32,
}

impl Record for ExtraCfg {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            spk_min_r0: read_u32(bytes, 0),
            spk_max_r0: read_u32(bytes, 4),
            spk_max_delta_r0: read_u32(bytes, 8),
        }
    }
}

/// Speaker calibration result. Lives in the writeable overlay.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalSpk {
    pub cal_ok: u32,
    pub r0: i32,
    pub t0: i32,
    pub wire_r0: i32,
    pub a: i32,
}

/// Speaker model parameters. Lives in the writeable overlay.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpkModel {
    /// Resonance frequency.
    pub f0: i32,
    /// Quality factor.
    pub q: i32,
    pub xthresh: i32,
    pub xthresh_rdc: i32,
}
