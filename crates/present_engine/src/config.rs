//! Configuration system
//!
//! Serializable configuration for window construction, with TOML
//! load/save support.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration trait with TOML file persistence
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a TOML file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration for one presentation window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial logical width in pixels
    pub width: u32,
    /// Initial logical height in pixels
    pub height: u32,
    /// Clear color applied at render pass begin (RGBA)
    pub clear_color: [f32; 4],
    /// Prefer a low-latency present mode (MAILBOX) over FIFO when available
    pub prefer_low_latency_present: bool,
    /// Overlay descriptor capacity per swapchain image
    pub overlay_descriptor_capacity: u32,
}

impl WindowConfig {
    /// Create a configuration with the given title and defaults otherwise
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: 1280,
            height: 720,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            prefer_low_latency_present: false,
            overlay_descriptor_capacity: 256,
        }
    }

    /// Set the initial window size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Prefer low-latency presentation
    pub fn with_low_latency_present(mut self, prefer: bool) -> Self {
        self.prefer_low_latency_present = prefer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.is_empty() {
            return Err(ConfigError::Invalid("Window title cannot be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("Window size must be non-zero".to_string()));
        }
        if self.overlay_descriptor_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Overlay descriptor capacity must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Presentation Window")
    }
}

impl Config for WindowConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(WindowConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let config = WindowConfig::new("test").with_size(0, 600);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let config = WindowConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_from_toml() {
        let toml_text = r#"
            title = "Scope Display"
            width = 800
            height = 600
            clear_color = [0.1, 0.1, 0.1, 1.0]
            prefer_low_latency_present = true
            overlay_descriptor_capacity = 128
        "#;
        let config: WindowConfig = toml::from_str(toml_text).expect("valid config");
        assert_eq!(config.title, "Scope Display");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.prefer_low_latency_present);
        assert!(config.validate().is_ok());
    }
}
