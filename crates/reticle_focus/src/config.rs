//! # Focus Configuration
//!
//! ```toml
//! no_hit_distance = 2.0
//! drag_slop_degrees = 2.0
//! cancel_slop_degrees = 35.0
//! device_preference = ["controller", "hmd"]
//! ray_origin_mode = "controller_if_real_6dof"
//! event_capacity = 1024
//! ```

use std::path::Path;

use reticle_input::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{FocusError, FocusResult};

/// Where the collision ray starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RayOriginMode {
    /// From the HMD unless the device tracks a real position.
    #[default]
    ControllerIfReal6Dof,
    /// Always from the device.
    AlwaysFromController,
    /// Always from the HMD when it has a position.
    AlwaysFromHmd,
}

/// Tunables of the focus pipeline. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Cursor distance when the cursor collaborator has no opinion.
    pub no_hit_distance: f32,
    /// Ray movement after which a press on a draggable target starts a drag.
    pub drag_slop_degrees: f32,
    /// Ray movement after which a press is canceled.
    pub cancel_slop_degrees: f32,
    /// Devices in order of preference; the first connected one is primary.
    pub device_preference: Vec<DeviceType>,
    /// Ray origin policy.
    pub ray_origin_mode: RayOriginMode,
    /// Capacity of the event bus.
    pub event_capacity: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            no_hit_distance: 2.0,
            drag_slop_degrees: 2.0,
            cancel_slop_degrees: 35.0,
            device_preference: vec![DeviceType::Controller, DeviceType::Hmd],
            ray_origin_mode: RayOriginMode::default(),
            event_capacity: 1024,
        }
    }
}

impl FocusConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`FocusError::InvalidConfig`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> FocusResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| FocusError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`FocusError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> FocusResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| FocusError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`FocusError::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> FocusResult<()> {
        if self.no_hit_distance.is_nan() || self.no_hit_distance <= 0.0 {
            return Err(FocusError::InvalidConfig("no_hit_distance must be positive".into()));
        }
        if self.drag_slop_degrees < 0.0 || self.cancel_slop_degrees < self.drag_slop_degrees {
            return Err(FocusError::InvalidConfig(
                "slop angles must satisfy 0 <= drag_slop_degrees <= cancel_slop_degrees".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(FocusError::InvalidConfig("event_capacity must be non-zero".into()));
        }
        Ok(())
    }

    /// Drag slop in radians.
    #[must_use]
    pub fn drag_slop(&self) -> f32 {
        self.drag_slop_degrees.to_radians()
    }

    /// Cancel slop in radians.
    #[must_use]
    pub fn cancel_slop(&self) -> f32 {
        self.cancel_slop_degrees.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = FocusConfig::from_toml_str("").unwrap();
        assert_eq!(config, FocusConfig::default());
        assert_eq!(config.device_preference, vec![DeviceType::Controller, DeviceType::Hmd]);
    }

    #[test]
    fn test_overrides() {
        let config = FocusConfig::from_toml_str(
            r#"
            no_hit_distance = 5.0
            device_preference = ["hmd"]
            ray_origin_mode = "always_from_controller"
            "#,
        )
        .unwrap();
        assert_eq!(config.no_hit_distance, 5.0);
        assert_eq!(config.device_preference, vec![DeviceType::Hmd]);
        assert_eq!(config.ray_origin_mode, RayOriginMode::AlwaysFromController);
        assert_eq!(config.cancel_slop_degrees, 35.0);
    }

    #[test]
    fn test_validation() {
        assert!(FocusConfig::from_toml_str("no_hit_distance = 0.0").is_err());
        assert!(FocusConfig::from_toml_str("drag_slop_degrees = 40.0").is_err());
        assert!(FocusConfig::from_toml_str("event_capacity = 0").is_err());
        assert!(FocusConfig::from_toml_str("ray_origin_mode = \"sideways\"").is_err());
    }
}
