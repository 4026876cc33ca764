//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. [`EngineConfig::validate`] runs before any renderer is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per real-time block.
    pub block_size: usize,
    /// Fixed attenuation applied to every track before summing.
    pub headroom: f64,
    pub limiter: LimiterConfig,
    pub export: ExportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 1024,
            headroom: 0.3,
            limiter: LimiterConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Soft-knee limiter parameters, in linear amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub threshold: f64,
    pub knee: f64,
    pub ratio: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            knee: 0.1,
            ratio: 4.0,
        }
    }
}

/// Offline render settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Length of each render chunk in seconds.
    pub chunk_seconds: f64,
    /// Apply `tanh(x·k)/k` to every chunk.
    pub soft_clip: bool,
    /// The `k` of the soft clipper.
    pub soft_clip_drive: f64,
    /// Divide the finished buffer by its peak when the peak exceeds 1.
    pub normalize: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: 1.0,
            soft_clip: true,
            soft_clip_drive: 0.8,
            normalize: true,
        }
    }
}

impl ExportConfig {
    /// Chunk length in frames at the given rate, at least one frame.
    pub fn chunk_frames(&self, sample_rate: u32) -> usize {
        ((self.chunk_seconds * sample_rate as f64).round() as usize).max(1)
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::Config("sample_rate must be positive".into()));
        }
        if self.block_size == 0 {
            return Err(EngineError::Config("block_size must be positive".into()));
        }
        if !(self.headroom.is_finite() && self.headroom > 0.0) {
            return Err(EngineError::Config("headroom must be positive".into()));
        }
        let l = &self.limiter;
        if !(l.threshold.is_finite() && l.threshold > 0.0) {
            return Err(EngineError::Config("limiter threshold must be positive".into()));
        }
        if !(l.knee.is_finite() && (0.0..=l.threshold).contains(&l.knee)) {
            return Err(EngineError::Config(format!(
                "limiter knee must lie in [0, {}]",
                l.threshold
            )));
        }
        if !(l.ratio.is_finite() && l.ratio >= 1.0) {
            return Err(EngineError::Config("limiter ratio must be at least 1".into()));
        }
        let e = &self.export;
        if !(e.chunk_seconds.is_finite() && e.chunk_seconds > 0.0) {
            return Err(EngineError::Config("export chunk_seconds must be positive".into()));
        }
        if !(e.soft_clip_drive.is_finite() && e.soft_clip_drive > 0.0) {
            return Err(EngineError::Config("soft_clip_drive must be positive".into()));
        }
        Ok(())
    }
}
