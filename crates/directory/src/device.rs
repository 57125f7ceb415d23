//! Device identity flags.
//!
//! The device identifier and chosen display name live in a small JSON file
//! next to the cache database, outside the structured store: they must
//! survive an explicit cache clear, and they are the only state keyed to
//! the device rather than to the dataset.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hamlet_core::DeviceId;

const FLAGS_FILE: &str = "device.json";

/// Errors that can occur loading or saving the device flags.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Flags file is corrupted.
    #[error("flags file error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Who this device is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Random identifier generated on first run, stable thereafter.
    pub device_id: DeviceId,
    /// Display name the user chose, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DeviceIdentity {
    /// Load the identity from `data_dir`, generating and persisting a fresh
    /// one on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the flags file cannot be read, parsed, or
    /// written.
    pub fn load_or_create(data_dir: &Path) -> Result<Self, DeviceError> {
        let path = flags_path(data_dir);

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            return Ok(serde_json::from_str(&contents)?);
        }

        let identity = Self {
            device_id: DeviceId::generate(),
            display_name: None,
        };
        identity.save(data_dir)?;
        debug!(device_id = %identity.device_id, "generated device identity");

        Ok(identity)
    }

    /// Set the display name and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the flags file cannot be written.
    pub fn set_display_name(
        &mut self,
        data_dir: &Path,
        name: impl Into<String>,
    ) -> Result<(), DeviceError> {
        self.display_name = Some(name.into());
        self.save(data_dir)
    }

    fn save(&self, data_dir: &Path) -> Result<(), DeviceError> {
        fs::create_dir_all(data_dir)?;
        fs::write(flags_path(data_dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn flags_path(data_dir: &Path) -> PathBuf {
    data_dir.join(FLAGS_FILE)
}
