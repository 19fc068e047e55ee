//! Firmware load orchestration.
//!
//! The firmware itself comes from an external provider (the OS firmware
//! subsystem on Linux, a flash partition on bare metal). Whatever the outcome,
//! the raw buffer is released before the consumer's pending actions run, and
//! they run exactly once per attempt.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::store::{LoadState, ParamStore};
use crate::validate::{self, validate, Validated, Warning};

/// Raw firmware buffer lent by a [`FirmwareProvider`].
///
/// Dropping it releases it back to the provider.
pub trait Firmware {
    fn data(&self) -> &[u8];
}

impl Firmware for Vec<u8> {
    fn data(&self) -> &[u8] {
        self
    }
}

impl Firmware for Box<[u8]> {
    fn data(&self) -> &[u8] {
        self
    }
}

impl Firmware for &[u8] {
    fn data(&self) -> &[u8] {
        self
    }
}

/// Source of firmware blobs.
#[allow(async_fn_in_trait)]
pub trait FirmwareProvider {
    type Firmware: Firmware;

    /// Fetch the blob called `name`. `None` when it cannot be delivered.
    async fn request(&self, name: &str) -> Option<Self::Firmware>;
}

/// Consumer hook run after every load attempt.
pub trait PendingActions {
    /// Resume work queued while the parameters were unavailable.
    fn pending_actions(&self);
}

/// Why a load attempt installed nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// The provider delivered no blob.
    NoFirmware,
    /// The blob was rejected.
    Invalid(validate::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFirmware => write!(f, "no firmware delivered"),
            Self::Invalid(e) => write!(f, "invalid firmware: {}", e),
        }
    }
}

impl core::error::Error for LoadError {}

impl From<validate::Error> for LoadError {
    fn from(e: validate::Error) -> Self {
        Self::Invalid(e)
    }
}

/// Result of one load attempt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    /// This attempt installed the image.
    Installed { warning: Option<Warning> },
    /// An image was already installed; the blob was not looked at.
    AlreadyLoaded,
    Failed(LoadError),
}

impl ParamStore {
    /// Request the configured blob from `dev` and load it.
    ///
    /// Safe to call from every channel: only the first valid blob is
    /// installed, and `dev.pending_actions()` runs once per call.
    pub async fn load_fw<D>(&self, dev: &D) -> LoadOutcome
    where
        D: FirmwareProvider + PendingActions,
    {
        let fw = dev.request(self.config().fw_name).await;
        self.container_loaded(fw, dev).await
    }

    /// Completion path for a delivered (or missing) blob.
    pub async fn container_loaded<F, P>(&self, fw: Option<F>, pending: &P) -> LoadOutcome
    where
        F: Firmware,
        P: PendingActions + ?Sized,
    {
        let outcome = match fw {
            Some(fw) => {
                let outcome = self.install_from(fw.data()).await;
                // Hand the buffer back before anyone is notified.
                drop(fw);
                outcome
            }
            None => self.no_firmware().await,
        };

        pending.pending_actions();
        outcome
    }

    async fn no_firmware(&self) -> LoadOutcome {
        let _guard = self.load_lock.lock().await;

        if self.is_loaded() {
            debug!("no firmware delivered, keeping installed param");
            return LoadOutcome::AlreadyLoaded;
        }

        error!("no firmware delivered");
        self.fail();
        LoadOutcome::Failed(LoadError::NoFirmware)
    }

    async fn install_from(&self, fw: &[u8]) -> LoadOutcome {
        let _guard = self.load_lock.lock().await;

        if self.is_loaded() {
            debug!("param already loaded, skipping {} byte blob", fw.len());
            return LoadOutcome::AlreadyLoaded;
        }

        self.set_state(LoadState::Loading);
        match validate(fw, self.config().fw_version) {
            Ok(Validated { param, warning }) => {
                info!(
                    "param loaded: version 0x{:08x}, {} data bytes",
                    param.version(),
                    param.data_size()
                );
                self.install(param);
                LoadOutcome::Installed { warning }
            }
            Err(e) => {
                self.fail();
                LoadOutcome::Failed(e.into())
            }
        }
    }
}
