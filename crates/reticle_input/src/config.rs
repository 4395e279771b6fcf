//! # Input Configuration
//!
//! ```toml
//! long_press_ms = 500
//! touch_velocity_cutoff_hz = 10.0
//! min_fling_velocity = 0.4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};

/// Tunables of the input layer. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Hold time after which a button counts as long pressed.
    pub long_press_ms: u64,
    /// Cutoff of the low-pass filter applied to touch velocity.
    pub touch_velocity_cutoff_hz: f32,
    /// Release speed (pad units per second) that counts as a fling on pads
    /// without native gestures.
    pub min_fling_velocity: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 500,
            touch_velocity_cutoff_hz: 10.0,
            min_fling_velocity: 0.4,
        }
    }
}

impl InputConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`InputError::InvalidConfig`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> InputResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| InputError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`InputError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> InputResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| InputError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`InputError::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> InputResult<()> {
        if self.touch_velocity_cutoff_hz.is_nan() || self.touch_velocity_cutoff_hz <= 0.0 {
            return Err(InputError::InvalidConfig(
                "touch_velocity_cutoff_hz must be positive".into(),
            ));
        }
        if self.min_fling_velocity < 0.0 {
            return Err(InputError::InvalidConfig(
                "min_fling_velocity must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Long press threshold.
    #[must_use]
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    /// RC time constant of the touch velocity filter, in seconds.
    #[must_use]
    pub fn touch_velocity_rc(&self) -> f32 {
        1.0 / (2.0 * std::f32::consts::PI * self.touch_velocity_cutoff_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        assert_eq!(InputConfig::from_toml_str("").unwrap(), InputConfig::default());
    }

    #[test]
    fn test_override_and_validation() {
        let config = InputConfig::from_toml_str("long_press_ms = 750").unwrap();
        assert_eq!(config.long_press(), Duration::from_millis(750));
        assert_eq!(config.touch_velocity_cutoff_hz, 10.0);

        let err = InputConfig::from_toml_str("touch_velocity_cutoff_hz = 0.0").unwrap_err();
        assert!(matches!(err, InputError::InvalidConfig(_)));
        assert!(InputConfig::from_toml_str("long_press_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(InputConfig::load("/nonexistent/reticle/input.toml").is_err());
    }
}
