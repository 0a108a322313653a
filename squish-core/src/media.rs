//! Media classification and codec selection.
//!
//! Files are classified by lowercase extension, with a header-sniffing
//! fallback for images whose extension is missing or unrecognized. The
//! audio encoder table mirrors what ffmpeg actually accepts for each
//! container: flac input is deliberately re-encoded to mp3 since a size
//! target is unreachable losslessly.

use image::ImageFormat;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl ImageKind {
    /// The extension used for output files of this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// The corresponding `image` crate format.
    #[must_use]
    pub fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

/// Supported audio input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Mp3,
    M4a,
    Wav,
    Flac,
    Aac,
    Ogg,
    Opus,
}

/// FFmpeg encoder selection for an audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEncoder {
    /// ffmpeg codec name passed to `-c:a`.
    pub codec: &'static str,
    /// Output file extension (no leading dot).
    pub extension: &'static str,
    /// Explicit container passed to `-f`, when the extension alone is not enough.
    pub container: Option<&'static str>,
    /// Forced output sample rate in Hz.
    pub sample_rate: Option<u32>,
}

impl AudioKind {
    /// Picks the encoder, output extension, and container for this input format.
    #[must_use]
    pub fn encoder(self) -> AudioEncoder {
        match self {
            Self::Mp3 => AudioEncoder {
                codec: "libmp3lame",
                extension: "mp3",
                container: None,
                sample_rate: None,
            },
            Self::Wav => AudioEncoder {
                codec: "pcm_s16le",
                extension: "wav",
                container: None,
                sample_rate: Some(44_100),
            },
            // Lossless input cannot hit a byte target; re-encode to mp3.
            Self::Flac => AudioEncoder {
                codec: "libmp3lame",
                extension: "mp3",
                container: None,
                sample_rate: None,
            },
            Self::Ogg => AudioEncoder {
                codec: "libopus",
                extension: "ogg",
                container: None,
                sample_rate: None,
            },
            Self::Opus => AudioEncoder {
                codec: "libopus",
                extension: "opus",
                container: None,
                sample_rate: None,
            },
            Self::M4a => AudioEncoder {
                codec: "aac",
                extension: "m4a",
                container: Some("mp4"),
                sample_rate: None,
            },
            Self::Aac => AudioEncoder {
                codec: "aac",
                extension: "aac",
                container: Some("mp4"),
                sample_rate: None,
            },
        }
    }
}

/// High-level classification of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image(ImageKind),
    Video,
    Audio(AudioKind),
}

impl MediaKind {
    /// Classifies by lowercase file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Image(ImageKind::Jpeg)),
            "png" => Some(Self::Image(ImageKind::Png)),
            "webp" => Some(Self::Image(ImageKind::WebP)),
            "gif" => Some(Self::Image(ImageKind::Gif)),
            "bmp" => Some(Self::Image(ImageKind::Bmp)),
            "tiff" => Some(Self::Image(ImageKind::Tiff)),
            "mp4" | "mov" | "mkv" | "avi" | "webm" | "flv" | "wmv" => Some(Self::Video),
            "mp3" => Some(Self::Audio(AudioKind::Mp3)),
            "m4a" => Some(Self::Audio(AudioKind::M4a)),
            "wav" => Some(Self::Audio(AudioKind::Wav)),
            "flac" => Some(Self::Audio(AudioKind::Flac)),
            "aac" => Some(Self::Audio(AudioKind::Aac)),
            "ogg" => Some(Self::Audio(AudioKind::Ogg)),
            "opus" => Some(Self::Audio(AudioKind::Opus)),
            _ => None,
        }
    }

    /// Classifies by the path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Best-effort header sniffing for files with a missing or unknown
    /// extension. Only image headers are recognized.
    #[must_use]
    pub fn sniff(path: &Path) -> Option<Self> {
        let mut header = [0u8; 64];
        let mut file = File::open(path).ok()?;
        let read = file.read(&mut header).ok()?;
        let format = image::guess_format(&header[..read]).ok()?;
        let kind = match format {
            ImageFormat::Jpeg => ImageKind::Jpeg,
            ImageFormat::Png => ImageKind::Png,
            ImageFormat::WebP => ImageKind::WebP,
            ImageFormat::Gif => ImageKind::Gif,
            ImageFormat::Bmp => ImageKind::Bmp,
            ImageFormat::Tiff => ImageKind::Tiff,
            _ => return None,
        };
        Some(Self::Image(kind))
    }

    /// Extension lookup first, header sniffing as a fallback.
    #[must_use]
    pub fn classify(path: &Path) -> Option<Self> {
        Self::from_path(path).or_else(|| Self::sniff(path))
    }
}
