//! Compression configuration shared by all job types.

use crate::error::{CoreError, CoreResult};
use crate::planning::ResolutionCap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which stream gets the larger share of a constrained bitrate budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Favor picture quality; audio is trimmed toward 60% of its source rate.
    Video,
    /// Favor audio fidelity; audio is boosted toward 140% of its source rate.
    Audio,
    /// Leave the source audio rate untouched.
    #[default]
    Balanced,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "balanced" => Ok(Self::Balanced),
            other => Err(format!(
                "unknown priority '{other}' (expected video, audio, or balanced)"
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Balanced => write!(f, "balanced"),
        }
    }
}

/// User-facing knobs for a compression run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Target output size in megabytes.
    pub target_mb: f64,
    /// Bitrate split preference for video files.
    pub priority: Priority,
    /// Maximum output resolution for video files.
    pub resolution: ResolutionCap,
    /// Output frame rate override for video files (clamped to 1..=120).
    pub fps: Option<u32>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            target_mb: 8.0,
            priority: Priority::Balanced,
            resolution: ResolutionCap::Auto,
            fps: None,
        }
    }
}

impl CompressionConfig {
    /// Validates the configuration, returning an error describing the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.target_mb.is_finite() || self.target_mb <= 0.0 {
            return Err(CoreError::Config(format!(
                "target size must be a positive number of megabytes, got {}",
                self.target_mb
            )));
        }
        Ok(())
    }
}
