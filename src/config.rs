//! Parameter store configuration.

use crate::schema::FW_VERSION;

/// Default firmware file requested from the firmware provider.
pub const DEFAULT_FW_NAME: &str = "sipa.bin";

/// Parameter store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Name of the blob requested from the [`FirmwareProvider`](crate::FirmwareProvider).
    pub fw_name: &'static str,
    /// The only header version accepted by the validator.
    pub fw_version: u32,
}

impl Config {
    /// Create a config with the default blob name and the compiled-in version.
    pub const fn new() -> Self {
        Self {
            fw_name: DEFAULT_FW_NAME,
            fw_version: FW_VERSION,
        }
    }

    /// Set the blob name.
    pub const fn fw_name(mut self, name: &'static str) -> Self {
        self.fw_name = name;
        self
    }

    /// Set the accepted header version.
    ///
    /// There is no forward or backward compatibility: a blob whose version
    /// differs from this value in any bit is rejected.
    pub const fn fw_version(mut self, version: u32) -> Self {
        self.fw_version = version;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
