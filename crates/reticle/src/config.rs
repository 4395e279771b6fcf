//! # Runtime Configuration
//!
//! One document configures every layer. Device tables connect the named
//! slot with that profile when the runtime starts.
//!
//! ```toml
//! timing_logs = true
//!
//! [input]
//! long_press_ms = 400
//!
//! [focus]
//! device_preference = ["controller", "hmd"]
//!
//! [devices.controller]
//! rotation_dof = "real"
//! num_buttons = 3
//! touchpads = [{ has_gestures = false }]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use reticle_focus::FocusConfig;
use reticle_input::{DeviceProfile, DeviceType, InputConfig};
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Frame budget at 90 Hz, in microseconds.
pub const DEFAULT_FRAME_BUDGET_US: u64 = 11_111;

/// Complete runtime configuration. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Input layer tunables.
    pub input: InputConfig,
    /// Focus pipeline tunables.
    pub focus: FocusConfig,
    /// Devices connected at startup, keyed by slot name (`controller`, `hmd`, ...).
    pub devices: BTreeMap<String, DeviceProfile>,
    /// Warn about frames over budget.
    pub timing_logs: bool,
    /// Frame budget in microseconds.
    pub frame_budget_us: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            focus: FocusConfig::default(),
            devices: BTreeMap::new(),
            timing_logs: false,
            frame_budget_us: DEFAULT_FRAME_BUDGET_US,
        }
    }
}

impl RuntimeConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidConfig`] on malformed TOML, plus any error of
    /// [`RuntimeConfig::validate`].
    pub fn from_toml_str(source: &str) -> RuntimeResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// The first failing section's error, or [`RuntimeError::UnknownDevice`].
    pub fn validate(&self) -> RuntimeResult<()> {
        self.input.validate()?;
        self.focus.validate()?;
        self.device_profiles()?;
        if self.frame_budget_us == 0 {
            return Err(RuntimeError::InvalidConfig("frame_budget_us must be non-zero".into()));
        }
        Ok(())
    }

    /// Device tables resolved to slots, in slot order.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownDevice`] for a table naming no slot.
    pub fn device_profiles(&self) -> RuntimeResult<Vec<(DeviceType, DeviceProfile)>> {
        let mut profiles = self
            .devices
            .iter()
            .map(|(name, profile)| {
                device_slot(name)
                    .map(|device| (device, profile.clone()))
                    .ok_or_else(|| RuntimeError::UnknownDevice(name.clone()))
            })
            .collect::<RuntimeResult<Vec<_>>>()?;
        profiles.sort_by_key(|(device, _)| *device);
        Ok(profiles)
    }
}

/// Slot named `name`, ignoring case.
#[must_use]
pub fn device_slot(name: &str) -> Option<DeviceType> {
    DeviceType::ALL
        .into_iter()
        .find(|device| device.name().eq_ignore_ascii_case(name))
}
