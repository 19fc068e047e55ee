//! Parameter store and channel-indexed accessors.
//!
//! ```no_run
//! use sipa_param::{Config, ParamStore};
//!
//! static PARAMS: ParamStore = ParamStore::new(Config::new());
//!
//! if let Ok(extra) = PARAMS.read_extra_cfg(0) {
//!     let _ = extra.spk_max_r0;
//! }
//! ```

use alloc::sync::Arc;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;

use crate::config::Config;
use crate::param::{ListError, Param, ParamData};
use crate::schema::{CalSpk, ChipCfg, ExtraCfg, SpkModel, CHANNEL_ENABLED, CHANNEL_NUM};

/// Accessor error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No image installed.
    NotLoaded,
    /// Channel index is `>= CHANNEL_NUM`.
    InvalidChannel { ch: usize },
    /// Channel is disabled in the blob.
    ChannelDisabled { ch: usize, ch_en: u8 },
    /// The channel's chip list is unusable (schema skew or bad bounds).
    List(ListError),
    /// No chip record with this type in the channel's list.
    ChipTypeNotFound { chip_type: u32, num: u32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "firmware not loaded"),
            Self::InvalidChannel { ch } => {
                write!(f, "channel {} >= CHANNEL_NUM({})", ch, CHANNEL_NUM)
            }
            Self::ChannelDisabled { ch, ch_en } => {
                write!(f, "channel {} disabled (ch_en = {})", ch, ch_en)
            }
            Self::List(e) => write!(f, "chip list: {}", e),
            Self::ChipTypeNotFound { chip_type, num } => {
                write!(f, "chip_type {} not in {} chip records", chip_type, num)
            }
        }
    }
}

impl core::error::Error for Error {}

impl From<ListError> for Error {
    fn from(e: ListError) -> Self {
        Self::List(e)
    }
}

/// Outcome of an accessor that has no backing implementation yet.
///
/// Both variants mean success.
#[must_use]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access<T = ()> {
    Done(T),
    /// Accepted, nothing read or written.
    NotImplemented,
}

impl<T> Access<T> {
    /// The value, if the accessor produced one.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::NotImplemented => None,
        }
    }
}

/// Load state of a [`ParamStore`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LoadState {
    Idle = 0,
    /// A blob is being validated.
    Loading = 1,
    Loaded = 2,
    /// The last attempt failed. Behaves as `Idle`: the next attempt may load.
    Failed = 3,
}

impl LoadState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Loading,
            2 => Self::Loaded,
            3 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Firmware-backed parameter store shared by every amplifier channel.
///
/// At most one image is ever installed between two [`release`](Self::release)
/// calls. Loads serialize on an internal lock; reads only test the load state
/// and clone the image handle, so they never wait for a validation in flight.
pub struct ParamStore {
    config: Config,
    pub(crate) load_lock: Mutex<CriticalSectionRawMutex, ()>,
    image: BlockingMutex<CriticalSectionRawMutex, RefCell<Option<Arc<Param>>>>,
    state: AtomicU8,
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(Config::new())
    }
}

impl ParamStore {
    /// Create an empty store. Usable in a `static`.
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            load_lock: Mutex::new(()),
            image: BlockingMutex::new(RefCell::new(None)),
            state: AtomicU8::new(LoadState::Idle as u8),
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current load state.
    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether an image is installed.
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded && self.image.lock(|image| image.borrow().is_some())
    }

    /// Read-only handle to the installed image.
    pub fn instance(&self) -> Option<ParamData> {
        if self.state() != LoadState::Loaded {
            return None;
        }
        self.image
            .lock(|image| image.borrow().clone())
            .map(ParamData)
    }

    /// Install a validated image and mark the store loaded.
    pub(crate) fn install(&self, param: Param) {
        let param = Arc::new(param);
        self.image.lock(|image| {
            *image.borrow_mut() = Some(param);
            self.set_state(LoadState::Loaded);
        });
    }

    /// Drop any installed image and mark the last attempt failed.
    pub(crate) fn fail(&self) {
        self.image.lock(|image| {
            image.borrow_mut().take();
            self.set_state(LoadState::Failed);
        });
    }

    /// Free the image and return to the unloaded state. Idempotent.
    ///
    /// Handles obtained earlier stay valid; they keep their own reference.
    pub fn release(&self) {
        // State and slot change together so a racing install is either
        // undone completely or lands completely afterwards.
        let released = self.image.lock(|image| {
            self.set_state(LoadState::Idle);
            image.borrow_mut().take()
        });
        if released.is_some() {
            debug!("param image released");
        }
    }

    fn enabled_channel(&self, ch: usize) -> Result<ParamData, Error> {
        let Some(param) = self.instance() else {
            warn!("firmware unload");
            return Err(Error::NotLoaded);
        };

        if ch >= CHANNEL_NUM {
            error!("ch({}) >= CHANNEL_NUM({})", ch, CHANNEL_NUM);
            return Err(Error::InvalidChannel { ch });
        }

        let ch_en = param.ch_en(ch).ok_or(Error::InvalidChannel { ch })?;
        if ch_en != CHANNEL_ENABLED {
            error!("ch_en[{}]({}) != {}", ch, ch_en, CHANNEL_ENABLED);
            return Err(Error::ChannelDisabled { ch, ch_en });
        }

        Ok(param)
    }

    /// Look up the chip configuration of `chip_type` on channel `ch`.
    ///
    /// Returns a copy of the record plus a handle to the data region so the
    /// nested register lists can be resolved.
    pub fn read_chip_cfg(&self, ch: usize, chip_type: u32) -> Result<(ChipCfg, ParamData), Error> {
        let param = self.enabled_channel(ch)?;
        let list = param.chip_cfg_list(ch).ok_or(Error::InvalidChannel { ch })?;

        let found = param
            .records::<ChipCfg>(&list)
            .map_err(|e| {
                error!("ch({}) chip list unusable: {:?}", ch, e);
                Error::List(e)
            })?
            .find(|cfg| cfg.chip_type == chip_type);

        match found {
            Some(cfg) => Ok((cfg, param)),
            None => {
                error!(
                    "chip_type({}) mismatch, num = {}, version = 0x{:08x}",
                    chip_type,
                    list.num,
                    param.version()
                );
                Err(Error::ChipTypeNotFound {
                    chip_type,
                    num: list.num,
                })
            }
        }
    }

    /// Copy of the extra configuration record of channel `ch`.
    pub fn read_extra_cfg(&self, ch: usize) -> Result<ExtraCfg, Error> {
        let param = self.enabled_channel(ch)?;
        param.extra_cfg(ch).ok_or(Error::InvalidChannel { ch })
    }

    /// Speaker calibration of channel `ch`.
    ///
    /// Not backed yet: always returns [`Access::NotImplemented`] and reads nothing.
    pub fn read_spk_calibration(&self, _ch: usize) -> Access<CalSpk> {
        Access::NotImplemented
    }

    /// Store a speaker calibration result for channel `ch`.
    ///
    /// Not backed yet: always returns [`Access::NotImplemented`] and writes nothing.
    pub fn write_spk_calibration(
        &self,
        _ch: usize,
        _cal_ok: bool,
        _r0: i32,
        _t0: i32,
        _wire_r0: i32,
        _a: i32,
    ) -> Access {
        Access::NotImplemented
    }

    /// Store a calibrated speaker resistance for channel `ch`.
    ///
    /// Not backed yet: always returns [`Access::NotImplemented`] and writes nothing.
    pub fn write_spk_r0(&self, _ch: usize, _r0: u32, _cal_ok: bool) -> Access {
        Access::NotImplemented
    }

    /// Speaker model of channel `ch`.
    ///
    /// Not backed yet: always returns [`Access::NotImplemented`] and reads nothing.
    pub fn read_spk_model(&self, _ch: usize) -> Access<SpkModel> {
        Access::NotImplemented
    }

    /// Override the speaker model of channel `ch`.
    ///
    /// Not backed yet: always returns [`Access::NotImplemented`] and writes nothing.
    pub fn write_spk_model(&self, _ch: usize, _model: &SpkModel) -> Access {
        Access::NotImplemented
    }
}
