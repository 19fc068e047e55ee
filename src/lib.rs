#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod crc;
pub mod loader;
pub mod param;
pub mod schema;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Config;
pub use loader::{Firmware, FirmwareProvider, LoadError, LoadOutcome, PendingActions};
pub use param::{ListError, Param, ParamData, Records, Writeable};
pub use schema::{
    CalSpk, ChipCfg, ExtraCfg, ParamList, Record, RegNode, SpkModel, CHANNEL_NUM, FW_HEADER_SIZE,
    FW_VERSION,
};
pub use store::{Access, LoadState, ParamStore};
pub use validate::{validate, Validated, Warning};
