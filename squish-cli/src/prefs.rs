//! Persisted user preferences.
//!
//! Defaults for the compression knobs live in a small JSON file so repeat
//! runs don't need the flags re-typed. Location: `$SQUISH_CONFIG` if set,
//! otherwise `$XDG_CONFIG_HOME/squish/prefs.json`, otherwise
//! `~/.config/squish/prefs.json`. A missing or malformed file silently
//! yields empty preferences.

use serde::{Deserialize, Serialize};
use squish_core::{CompressionConfig, Priority, ResolutionCap};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub target_mb: Option<f64>,
    pub priority: Option<Priority>,
    pub resolution: Option<ResolutionCap>,
    pub fps: Option<u32>,
}

impl Preferences {
    /// Folds these preferences over the built-in defaults, then applies any
    /// explicit overrides on top.
    pub fn resolve(
        &self,
        target_mb: Option<f64>,
        priority: Option<Priority>,
        resolution: Option<ResolutionCap>,
        fps: Option<u32>,
    ) -> CompressionConfig {
        let defaults = CompressionConfig::default();
        CompressionConfig {
            target_mb: target_mb.or(self.target_mb).unwrap_or(defaults.target_mb),
            priority: priority.or(self.priority).unwrap_or(defaults.priority),
            resolution: resolution
                .or(self.resolution)
                .unwrap_or(defaults.resolution),
            fps: fps.or(self.fps),
        }
    }

    /// Captures a resolved config back into preference form for saving.
    pub fn from_config(config: &CompressionConfig) -> Self {
        Self {
            target_mb: Some(config.target_mb),
            priority: Some(config.priority),
            resolution: Some(config.resolution),
            fps: config.fps,
        }
    }
}

pub fn prefs_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SQUISH_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("squish").join("prefs.json"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("squish").join("prefs.json"))
}

pub fn load() -> Preferences {
    let Some(path) = prefs_path() else {
        return Preferences::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed preferences at {}: {e}", path.display());
            Preferences::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Preferences::default(),
        Err(e) => {
            log::warn!("Failed to read preferences at {}: {e}", path.display());
            Preferences::default()
        }
    }
}

pub fn save(prefs: &Preferences) -> io::Result<()> {
    let Some(path) = prefs_path() else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no usable preferences location (set SQUISH_CONFIG or HOME)",
        ));
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(prefs).map_err(io::Error::other)?;
    std::fs::write(&path, json)?;
    log::debug!("Saved preferences to {}", path.display());
    Ok(())
}
