//! Interactions with external tools and the file system.
//!
//! Encapsulates ffmpeg and ffprobe behind small traits and helpers so the
//! processing code can be exercised with injected fakes. The default
//! implementations use the ffmpeg-sidecar and ffprobe crates.

use crate::error::{CoreError, CoreResult};
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// ffmpeg argument building and the monitored transcode runner
pub mod ffmpeg;

/// ffprobe media inspection behind an injectable trait
pub mod ffprobe;

pub use ffmpeg::{
    EncodeOutcome, EventFlow, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner,
    run_transcode,
};
pub use ffprobe::{CrateFfprobeExecutor, FfprobeExecutor, MediaProbe};

/// Checks that a required external command is available by running it with
/// `-version` and discarding all output.
pub(crate) fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            Err(crate::error::command_start_error(cmd_name, e))
        }
    }
}

/// Trait for abstracting file metadata access.
///
/// Decouples size lookups from the real file system so driver logic can be
/// tested with fixed sizes.
pub trait FileMetadataProvider {
    /// Gets the size of the file at the given path in bytes.
    fn get_size(&self, path: &Path) -> CoreResult<u64>;
}

/// Standard implementation of [`FileMetadataProvider`] using `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct StdFsMetadataProvider;

impl FileMetadataProvider for StdFsMetadataProvider {
    fn get_size(&self, path: &Path) -> CoreResult<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}
