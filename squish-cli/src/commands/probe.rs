//! The `probe` command: show the media properties the planners use.

use crate::output::{print_heading, print_info};
use squish_core::external::{CrateFfprobeExecutor, FfprobeExecutor};
use squish_core::{MediaKind, format_bytes, format_duration};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// File to inspect
    #[arg(required = true, value_name = "FILE")]
    pub file: PathBuf,
}

pub fn execute(args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let kind = MediaKind::classify(&args.file);
    let size = std::fs::metadata(&args.file)?.len();

    print_heading("Media information");
    print_info("File", args.file.display());
    print_info("Size", format_bytes(size));
    print_info(
        "Type",
        match kind {
            Some(MediaKind::Image(_)) => "image",
            Some(MediaKind::Video) => "video",
            Some(MediaKind::Audio(_)) => "audio",
            None => "unknown",
        },
    );

    // Images carry everything squish needs in their headers; only av files
    // are worth an ffprobe run.
    if matches!(kind, Some(MediaKind::Video | MediaKind::Audio(_))) {
        let probe = CrateFfprobeExecutor::new().probe(&args.file)?;
        if let Some(duration) = probe.duration_secs {
            print_info("Duration", format_duration(duration));
        }
        if let (Some(width), Some(height)) = (probe.width, probe.height) {
            print_info("Dimensions", format!("{width}x{height}"));
        }
        if let Some(codec) = &probe.audio_codec {
            print_info("Audio codec", codec);
        }
        if let Some(bitrate) = probe.audio_bitrate_kbps {
            print_info("Audio bitrate", format!("{bitrate} kbps"));
        }
    } else if let Some(MediaKind::Image(_)) = kind {
        if let Ok((width, height)) = squish_core::processing::image::image_dimensions(&args.file) {
            print_info("Dimensions", format!("{width}x{height}"));
        }
    }
    Ok(())
}
