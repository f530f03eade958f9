//! Viewer configuration stored as JSON.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::view::{DEFAULT_PADDING, MAX_SCALE, MIN_SCALE};

/// Selection applied right after a report is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialSelection {
    #[default]
    Empty,
    All,
}

/// Tunables of the interactive viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Screen padding kept around a fitted model, in pixels.
    pub padding: f64,
    /// Pointer travel in pixels beyond which a press becomes a pan.
    pub click_threshold: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Factor applied by the zoom-in button; zoom-out uses its reciprocal.
    pub zoom_step: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub initial_selection: InitialSelection,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            click_threshold: 5.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_step: 1.25,
            viewport_width: 800.0,
            viewport_height: 600.0,
            initial_selection: InitialSelection::Empty,
        }
    }
}

impl ViewerConfig {
    /// Checks that the zoom range and step describe a usable view.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let usable_range = self.min_scale > 0.0
            && self.min_scale <= self.max_scale
            && self.max_scale.is_finite();
        if !usable_range {
            return Err(ConfigError::Invalid(format!(
                "scale range [{}, {}] must satisfy 0 < min_scale <= max_scale",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.zoom_step > 0.0 && self.zoom_step.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "zoom_step {} must be positive",
                self.zoom_step
            )));
        }
        if !(self.click_threshold >= 0.0 && self.padding >= 0.0) {
            return Err(ConfigError::Invalid(
                "click_threshold and padding must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads and validates a configuration file.
pub fn read_config_json(path: &str) -> Result<ViewerConfig, ConfigError> {
    let contents = crate::io::read_to_string(path)?;
    let config: ViewerConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

pub fn write_config_json(path: &str, config: &ViewerConfig) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    crate::io::write_string(path, &json)?;
    Ok(())
}
