//! Engine configuration.
//!
//! [`EngineConfig`] is read once at startup from a JSON file. Every field has
//! a default, so a config file only needs to name what it overrides.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Window parameters passed to the platform layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "ember".to_owned(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation step per frame, in seconds. Must be positive and finite.
    pub fixed_dt: f64,
    /// Skip rendering entirely.
    pub headless: bool,
    /// RGBA colour the backbuffer is cleared to each frame.
    pub clear_color: [f32; 4],
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Entity slots to reserve up front.
    pub initial_entity_capacity: usize,
    /// Bytes reserved for entity names and other metadata strings. Must be
    /// non-zero.
    pub meta_arena_bytes: usize,
    pub window: WindowConfig,
}

impl Default for EngineConfig {
    /// 60 Hz, windowed, cleared to a dark grey.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            headless: false,
            clear_color: [0.1, 0.1, 0.12, 1.0],
            log_filter: "warn".to_owned(),
            initial_entity_capacity: 0,
            meta_arena_bytes: 64 * 1024,
            window: WindowConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("invalid engine config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    /// Reject values the frame loop cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if self.meta_arena_bytes == 0 {
            return Err(EngineError::InvalidConfig(
                "meta_arena_bytes must be non-zero".to_owned(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "window must be at least 1x1, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
