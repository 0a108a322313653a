//! FFprobe integration for media inspection.
//!
//! Extracts the handful of properties the planners need: duration, video
//! dimensions, and the first audio stream's codec and bitrate.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Properties of a probed media file.
#[derive(Debug, Default, Clone)]
pub struct MediaProbe {
    /// Duration of the media in seconds.
    pub duration_secs: Option<f64>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
    /// Codec name of the first audio stream (e.g. "aac").
    pub audio_codec: Option<String>,
    /// Bitrate of the first audio stream in kbps.
    pub audio_bitrate_kbps: Option<u32>,
    /// Whether any video stream is present.
    pub has_video: bool,
    /// Whether any audio stream is present.
    pub has_audio: bool,
}

/// Trait for executing ffprobe, injectable for tests.
pub trait FfprobeExecutor {
    /// Probes the media file at the given path.
    fn probe(&self, path: &Path) -> CoreResult<MediaProbe>;
}

/// Concrete implementation backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe(&self, path: &Path) -> CoreResult<MediaProbe> {
        log::debug!("Running ffprobe (via crate) on: {}", path.display());
        match ffprobe(path) {
            Ok(metadata) => {
                let duration_secs = metadata
                    .format
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse::<f64>().ok());

                let mut probe = MediaProbe {
                    duration_secs,
                    ..Default::default()
                };

                if let Some(video_stream) = metadata
                    .streams
                    .iter()
                    .find(|s| s.codec_type.as_deref() == Some("video"))
                {
                    probe.has_video = true;
                    probe.width = video_stream.width.and_then(|w| u32::try_from(w).ok());
                    probe.height = video_stream.height.and_then(|h| u32::try_from(h).ok());
                }

                if let Some(audio_stream) = metadata
                    .streams
                    .iter()
                    .find(|s| s.codec_type.as_deref() == Some("audio"))
                {
                    probe.has_audio = true;
                    probe.audio_codec = audio_stream.codec_name.clone();
                    probe.audio_bitrate_kbps = audio_stream
                        .bit_rate
                        .as_deref()
                        .and_then(|b| b.parse::<f64>().ok())
                        .map(|bps| (bps / 1000.0).round() as u32);
                }

                Ok(probe)
            }
            Err(err) => {
                log::error!("ffprobe failed on {}: {err:?}", path.display());
                Err(map_ffprobe_error(err, path))
            }
        }
    }
}

fn map_ffprobe_error(err: FfProbeError, path: &Path) -> CoreError {
    let context = path.display();
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::JsonParseError(format!(
            "ffprobe output deserialization for {context}: {err}"
        )),
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error for {context}: {err:?}")),
    }
}
