//! Validated parameter image.
//!
//! A [`Param`] owns a verbatim copy of the firmware bytes plus the zeroed
//! writeable overlay. Every offset/count descriptor read out of the image is
//! resolved through [`Records`], which checks the record size and the bounds
//! of the data region before any indexed access.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::slice::ChunksExact;

use crate::schema::{
    read_u32, ExtraCfg, ParamList, Record, CalSpk, SpkModel, CHANNEL_ENABLED, CHANNEL_NUM,
    CH_EN_OFFSET, CHIP_CFG_OFFSET, CRC_OFFSET, DATA_SIZE_OFFSET, EXTRA_CFG_OFFSET,
    FW_HEADER_SIZE, VERSION_OFFSET,
};

/// Error resolving a [`ParamList`] against the data region.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListError {
    /// The producer's record size differs from the compiled-in layout.
    NodeSizeMismatch { node_size: u32, expected: usize },
    /// `offset + num * node_size` runs past the end of the data region.
    OutOfBounds { offset: u32, num: u32, data_len: usize },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeSizeMismatch { node_size, expected } => {
                write!(f, "node_size({}) != record size({})", node_size, expected)
            }
            Self::OutOfBounds {
                offset,
                num,
                data_len,
            } => write!(
                f,
                "list offset({}) num({}) exceeds data region ({} bytes)",
                offset, num, data_len
            ),
        }
    }
}

impl core::error::Error for ListError {}

/// Writeable overlay allocated together with the firmware image.
///
/// Starts zeroed; runtime calibration is meant to land here.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Writeable {
    pub cal_spk: [CalSpk; CHANNEL_NUM],
    pub spk_model: [SpkModel; CHANNEL_NUM],
}

/// Validated, immutable firmware image.
pub struct Param {
    writeable: Writeable,
    fw: Box<[u8]>,
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("version", &self.version())
            .field("data_size", &self.data_size())
            .finish_non_exhaustive()
    }
}

impl Param {
    /// Copy already validated firmware bytes into a fresh image.
    ///
    /// `fw` must be exactly `FW_HEADER_SIZE + data_size` bytes.
    pub(crate) fn copy_from(fw: &[u8]) -> Option<Self> {
        debug_assert!(fw.len() >= FW_HEADER_SIZE);

        let mut buf = Vec::new();
        buf.try_reserve_exact(fw.len()).ok()?;
        buf.extend_from_slice(fw);

        Some(Self {
            writeable: Writeable::default(),
            fw: buf.into_boxed_slice(),
        })
    }

    /// Stored CRC-32.
    pub fn crc(&self) -> u32 {
        read_u32(&self.fw, CRC_OFFSET)
    }

    /// Header version.
    pub fn version(&self) -> u32 {
        read_u32(&self.fw, VERSION_OFFSET)
    }

    /// Declared length of the data region.
    pub fn data_size(&self) -> u32 {
        read_u32(&self.fw, DATA_SIZE_OFFSET)
    }

    /// Raw enable flag of channel `ch`, `None` if `ch >= CHANNEL_NUM`.
    pub fn ch_en(&self, ch: usize) -> Option<u8> {
        if ch >= CHANNEL_NUM {
            return None;
        }
        Some(self.fw[CH_EN_OFFSET + ch])
    }

    /// Whether channel `ch` exists and is enabled.
    pub fn channel_enabled(&self, ch: usize) -> bool {
        self.ch_en(ch) == Some(CHANNEL_ENABLED)
    }

    /// Chip configuration list descriptor of channel `ch`.
    pub fn chip_cfg_list(&self, ch: usize) -> Option<ParamList> {
        self.record_at::<ParamList>(CHIP_CFG_OFFSET, ch)
    }

    /// Extra configuration record of channel `ch`.
    pub fn extra_cfg(&self, ch: usize) -> Option<ExtraCfg> {
        self.record_at::<ExtraCfg>(EXTRA_CFG_OFFSET, ch)
    }

    fn record_at<T: Record>(&self, base: usize, ch: usize) -> Option<T> {
        if ch >= CHANNEL_NUM {
            return None;
        }
        let at = base + ch * T::SIZE;
        Some(T::decode(&self.fw[at..at + T::SIZE]))
    }

    /// Firmware bytes exactly as received, without producer padding.
    pub fn raw(&self) -> &[u8] {
        &self.fw
    }

    /// Trailing data region addressed by [`ParamList`] offsets.
    pub fn data(&self) -> &[u8] {
        &self.fw[FW_HEADER_SIZE..]
    }

    /// The writeable overlay.
    pub fn writeable(&self) -> &Writeable {
        &self.writeable
    }

    /// Resolve `list` against the data region.
    ///
    /// An absent list (`node_size == 0` and `num == 0`) resolves to no records.
    /// Any other descriptor must carry `T`'s record size.
    pub fn list<T: Record>(&self, list: &ParamList) -> Result<Records<'_, T>, ListError> {
        if list.node_size == 0 && list.num == 0 {
            return Ok(Records::empty());
        }
        self.records(list)
    }

    /// Like [`list`](Self::list), but the node size is checked even for an
    /// empty list.
    pub(crate) fn records<T: Record>(
        &self,
        list: &ParamList,
    ) -> Result<Records<'_, T>, ListError> {
        Records::new(self.data(), list)
    }
}

/// Bounds-checked view of `num` records inside the data region.
pub struct Records<'a, T> {
    chunks: ChunksExact<'a, u8>,
    _phantom: PhantomData<T>,
}

impl<'a, T: Record> Records<'a, T> {
    fn empty() -> Self {
        Self {
            chunks: (&[] as &'a [u8]).chunks_exact(T::SIZE),
            _phantom: PhantomData,
        }
    }

    fn new(data: &'a [u8], list: &ParamList) -> Result<Self, ListError> {
        if list.node_size as usize != T::SIZE {
            return Err(ListError::NodeSizeMismatch {
                node_size: list.node_size,
                expected: T::SIZE,
            });
        }

        let out_of_bounds = ListError::OutOfBounds {
            offset: list.offset,
            num: list.num,
            data_len: data.len(),
        };
        let start = list.offset as usize;
        let end = (list.num as usize)
            .checked_mul(T::SIZE)
            .and_then(|len| len.checked_add(start))
            .ok_or(out_of_bounds)?;
        if end > data.len() {
            return Err(out_of_bounds);
        }

        Ok(Self {
            chunks: data[start..end].chunks_exact(T::SIZE),
            _phantom: PhantomData,
        })
    }
}

impl<T: Record> Iterator for Records<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chunks.next().map(T::decode)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<T: Record> ExactSizeIterator for Records<'_, T> {}

/// Shared read-only handle to an installed image.
///
/// Keeps the image alive for as long as the handle exists, even across
/// [`ParamStore::release`](crate::ParamStore::release).
#[derive(Debug, Clone)]
pub struct ParamData(pub(crate) Arc<Param>);

impl ParamData {
    /// Trailing data region.
    pub fn bytes(&self) -> &[u8] {
        self.0.data()
    }

    /// Resolve a nested list (e.g. [`ChipCfg::init`](crate::ChipCfg::init)).
    pub fn list<T: Record>(&self, list: &ParamList) -> Result<Records<'_, T>, ListError> {
        self.0.list(list)
    }
}

impl core::ops::Deref for ParamData {
    type Target = Param;

    fn deref(&self) -> &Param {
        &self.0
    }
}
