//! Engine Configuration
//!
//! Loaded from JSON; every field has a default so a partial file works.

use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::render::renderer::PixelOrder;
use crate::render::animation::DestructionBlink;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not read the file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parsed but unusable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Ticks per second.
    pub refresh_rate: u32,
    /// Seed for all engine randomness.
    pub rng_seed: u64,
    /// Skip simulation while an animation runs.
    pub pause_during_animations: bool,
    /// LED wiring order.
    pub pixel_order: PixelOrder,
    /// Blinks per destruction animation.
    pub blink_cycles: u32,
    /// How long shutdown waits for pending error reports.
    pub report_drain_timeout_ms: u64,
    /// Project identifier attached to error reports.
    pub project_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            refresh_rate: 60,
            rng_seed: 0x5EED,
            pause_during_animations: true,
            pixel_order: PixelOrder::Serpentine,
            blink_cycles: DestructionBlink::DEFAULT_BLINKS,
            report_drain_timeout_ms: 2_000,
            project_id: "local".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "field must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > i32::MAX as u32 / 4 || self.height > i32::MAX as u32 / 4 {
            return Err(ConfigError::Invalid("field too large".into()));
        }
        if self.refresh_rate == 0 {
            return Err(ConfigError::Invalid("refresh_rate must be positive".into()));
        }
        Ok(())
    }

    /// Time between ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.refresh_rate.max(1)
    }

    /// How long shutdown waits for error reports.
    pub fn report_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.report_drain_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height), (16, 16));
        assert_eq!(config.refresh_rate, 60);
        assert!(config.pause_during_animations);
        assert_eq!(config.blink_cycles, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json_str(r#"{"width": 10, "pixel_order": "row_major"}"#).unwrap();
        assert_eq!(config.width, 10);
        assert_eq!(config.height, 16);
        assert_eq!(config.pixel_order, PixelOrder::RowMajor);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"height": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"refresh_rate": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EngineConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tick_period() {
        let config = EngineConfig { refresh_rate: 50, ..Default::default() };
        assert_eq!(config.tick_period(), Duration::from_millis(20));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/pixelgrid.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
