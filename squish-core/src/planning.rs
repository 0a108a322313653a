//! Pure planning arithmetic: target sizes, bitrate splits, the image
//! quality ladder, and resolution caps.
//!
//! Nothing in this module touches the filesystem or spawns processes, so
//! every branch is unit-testable. The processing modules turn these plans
//! into ffmpeg arguments or image encoder settings.

use crate::config::Priority;
use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Targets below this are clamped up; a smaller file is not realistically
/// encodable.
pub const MIN_TARGET_BYTES: u64 = 10 * 1024;

/// Maximum attempts in the image quality ladder.
pub const MAX_IMAGE_PASSES: u32 = 10;

/// Assumed source audio bitrate when ffprobe reports none.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;

/// Converts a megabyte target into a byte budget, clamped to [`MIN_TARGET_BYTES`].
#[must_use]
pub fn target_bytes(target_mb: f64) -> u64 {
    let bytes = (target_mb * 1024.0 * 1024.0).round();
    if bytes.is_finite() && bytes > MIN_TARGET_BYTES as f64 {
        bytes as u64
    } else {
        MIN_TARGET_BYTES
    }
}

/// The bitrate split for one video encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitratePlan {
    /// Combined budget in kbps derived from the byte target and duration.
    pub total_target_kbps: u32,
    /// Share of the budget reserved for audio.
    pub audio_alloc_kbps: u32,
    /// Video bitrate, floored at 16 kbps.
    pub video_kbps: u32,
    /// Whether the source audio stream can be stream-copied instead of re-encoded.
    pub copy_audio: bool,
}

/// Applies the priority adjustment to the source audio bitrate.
#[must_use]
pub fn adjusted_audio_kbps(source_kbps: Option<u32>, priority: Priority) -> u32 {
    let source = f64::from(source_kbps.unwrap_or(DEFAULT_AUDIO_BITRATE_KBPS));
    match priority {
        Priority::Video => (source * 0.6).round().max(64.0) as u32,
        Priority::Audio => (source * 1.4).round().max(128.0) as u32,
        Priority::Balanced => source as u32,
    }
}

/// Splits a byte budget over a known duration into audio and video bitrates.
///
/// Small totals reserve a fixed fraction for audio so speech stays
/// intelligible; large totals cap audio at 15% or the adjusted source rate,
/// whichever is lower. Audio is stream-copied only when the source is
/// already aac and fits inside its allocation.
#[must_use]
pub fn plan_video_bitrates(
    target_bytes: u64,
    duration_secs: f64,
    source_audio_kbps: Option<u32>,
    source_audio_codec: Option<&str>,
    priority: Priority,
) -> BitratePlan {
    let adjusted_audio = adjusted_audio_kbps(source_audio_kbps, priority);

    let total = ((target_bytes as f64 * 8.0) / duration_secs / 1000.0)
        .round()
        .max(1.0) as u32;

    let audio_alloc = if total <= 64 {
        ((f64::from(total) * 0.15).round() as u32).max(8)
    } else if total <= 256 {
        ((f64::from(total) * 0.12).round() as u32).max(16)
    } else {
        adjusted_audio.min((f64::from(total) * 0.15).round() as u32)
    };
    // Audio may never consume the whole budget.
    let audio_alloc = audio_alloc.min(total.saturating_sub(1).max(1));

    let video = total.saturating_sub(audio_alloc).max(16);
    let copy_audio = source_audio_codec == Some("aac") && adjusted_audio <= audio_alloc;

    BitratePlan {
        total_target_kbps: total,
        audio_alloc_kbps: audio_alloc,
        video_kbps: video,
        copy_audio,
    }
}

/// Bitrate for an audio-only encode toward a byte target.
#[must_use]
pub fn plan_audio_bitrate(target_bytes: u64, duration_secs: f64) -> u32 {
    let duration = duration_secs.floor().max(1.0);
    let total = ((target_bytes as f64 * 8.0) / duration / 1000.0)
        .round()
        .max(8.0) as u32;
    total.max(16)
}

/// Maximum output resolution for video encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionCap {
    P64,
    P144,
    P240,
    P360,
    P480,
    P720,
    P1080,
    #[default]
    Auto,
}

impl ResolutionCap {
    /// Bounding box (width, height) the output must fit inside. Auto behaves
    /// like a 720p cap.
    #[must_use]
    pub fn bounding_box(self) -> (u32, u32) {
        match self {
            Self::P64 => (112, 64),
            Self::P144 => (256, 144),
            Self::P240 => (426, 240),
            Self::P360 => (640, 360),
            Self::P480 => (854, 480),
            Self::P720 | Self::Auto => (1280, 720),
            Self::P1080 => (1920, 1080),
        }
    }
}

impl FromStr for ResolutionCap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "64p" | "64" => Ok(Self::P64),
            "144p" | "144" => Ok(Self::P144),
            "240p" | "240" => Ok(Self::P240),
            "360p" | "360" => Ok(Self::P360),
            "480p" | "480" => Ok(Self::P480),
            "720p" | "720" => Ok(Self::P720),
            "1080p" | "1080" => Ok(Self::P1080),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown resolution '{other}' (expected 64p..1080p or auto)"
            )),
        }
    }
}

impl fmt::Display for ResolutionCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P64 => write!(f, "64p"),
            Self::P144 => write!(f, "144p"),
            Self::P240 => write!(f, "240p"),
            Self::P360 => write!(f, "360p"),
            Self::P480 => write!(f, "480p"),
            Self::P720 => write!(f, "720p"),
            Self::P1080 => write!(f, "1080p"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Builds the ffmpeg scale filter that fits the source inside a bounding box
/// without upscaling, preserving aspect ratio and keeping dimensions even.
#[must_use]
pub fn scale_filter(max_width: u32, max_height: u32) -> String {
    format!(
        "scale='if(gt(iw/ih,{max_width}/{max_height}),min({max_width},iw),-2)':'if(gt(iw/ih,{max_width}/{max_height}),-2,min({max_height},ih))'"
    )
}

/// Clamps a frame rate override to the sane range ffmpeg accepts here.
#[must_use]
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(1, 120)
}

/// One attempt in the image quality ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePass {
    /// Zero-based attempt number.
    pub pass: u32,
    /// Lossy quality for this attempt (floored at 20).
    pub quality: u8,
    /// Resize width, `None` on the first attempt (original dimensions).
    pub width: Option<u32>,
}

impl ImagePass {
    /// The initial attempt: original dimensions at quality 90.
    #[must_use]
    pub fn first() -> Self {
        Self {
            pass: 0,
            quality: 90,
            width: None,
        }
    }

    /// The next, more aggressive attempt: quality shrinks by 15% and width
    /// by 10%, floored at 20 and 32 px respectively.
    #[must_use]
    pub fn next(self, source_width: u32) -> Self {
        let prev_width = self.width.unwrap_or(source_width);
        Self {
            pass: self.pass + 1,
            quality: ((f64::from(self.quality) * 0.85).round() as u8).max(20),
            width: Some(((f64::from(prev_width) * 0.9).round() as u32).max(32)),
        }
    }

    /// Whether this is the final attempt, which writes its result regardless
    /// of size.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.pass + 1 >= MAX_IMAGE_PASSES
    }

    /// Progress after this attempt fails, scaled so the ladder tops out at
    /// 90% and the final write reports 100%.
    #[must_use]
    pub fn progress_percent(self) -> u8 {
        let percent = (f64::from(self.pass + 1) / f64::from(MAX_IMAGE_PASSES) * 90.0).round() as u8;
        percent.min(90)
    }
}

/// PNG compression effort for a ladder attempt: starts at the maximum and
/// backs off every second pass to keep late attempts fast.
#[must_use]
pub fn png_compression_level(pass: u32) -> u8 {
    9u8.saturating_sub((pass / 2).min(9) as u8)
}

/// Rough prediction of the output size for the summary display. Videos use
/// the source bitrate minus the audio share with a 200 kbps floor and a 1%
/// container overhead; images rarely land exactly on target, so 95% of the
/// budget is assumed.
#[must_use]
pub fn estimate_compressed_bytes(
    kind: MediaKind,
    source_bytes: u64,
    target_bytes: u64,
    duration_secs: Option<f64>,
    source_audio_kbps: Option<u32>,
    priority: Priority,
) -> u64 {
    match kind {
        MediaKind::Image(_) => source_bytes.min((target_bytes as f64 * 0.95).round() as u64),
        MediaKind::Audio(_) => source_bytes.min(target_bytes),
        MediaKind::Video => {
            let Some(duration) = duration_secs.filter(|d| *d > 0.0) else {
                return source_bytes.min(target_bytes);
            };
            let adjusted_audio = f64::from(adjusted_audio_kbps(source_audio_kbps, priority));
            let source_kbps = source_bytes as f64 * 8.0 / duration / 1000.0;
            let video_kbps = (source_kbps - adjusted_audio).max(200.0);
            ((video_kbps + adjusted_audio) * 1000.0 / 8.0 * duration * 1.01).round() as u64
        }
    }
}
