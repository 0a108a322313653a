//! The `estimate` command: predict output sizes without compressing.

use crate::output::{print_heading, print_info, print_warning};
use crate::prefs;
use squish_core::external::{CrateFfprobeExecutor, FfprobeExecutor};
use squish_core::planning::{estimate_compressed_bytes, target_bytes};
use squish_core::{MediaKind, Priority, format_bytes, get_filename_safe};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct EstimateArgs {
    /// Files to estimate
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Target output size in megabytes
    #[arg(short = 's', long = "size", value_name = "MB")]
    pub size_mb: Option<f64>,

    /// Bitrate priority for video files: video, audio, or balanced
    #[arg(long, value_name = "PRIORITY")]
    pub priority: Option<Priority>,
}

pub fn execute(args: EstimateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stored = prefs::load();
    let config = stored.resolve(args.size_mb, args.priority, None, None);
    config.validate()?;

    let target = target_bytes(config.target_mb);
    let prober = CrateFfprobeExecutor::new();

    print_heading("Estimated output sizes");
    print_info("Target size", format!("{} MB", config.target_mb));
    println!();

    for file in &args.files {
        let name = get_filename_safe(file).unwrap_or_else(|_| file.display().to_string());
        let Some(kind) = MediaKind::classify(file) else {
            print_warning(&format!("{name}: unrecognized media type"));
            continue;
        };
        let source_bytes = match std::fs::metadata(file) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                print_warning(&format!("{name}: {e}"));
                continue;
            }
        };

        // Only av files need a probe; a probe failure degrades the estimate
        // rather than skipping the file.
        let (duration, audio_kbps) = match kind {
            MediaKind::Video | MediaKind::Audio(_) => match prober.probe(file) {
                Ok(probe) => (probe.duration_secs, probe.audio_bitrate_kbps),
                Err(e) => {
                    log::debug!("probe failed for {}: {e}", file.display());
                    (None, None)
                }
            },
            MediaKind::Image(_) => (None, None),
        };

        let estimate = estimate_compressed_bytes(
            kind,
            source_bytes,
            target,
            duration,
            audio_kbps,
            config.priority,
        );
        print_info(
            &name,
            format!("{} -> ~{}", format_bytes(source_bytes), format_bytes(estimate)),
        );
    }
    Ok(())
}
