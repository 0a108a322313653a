//! Size-targeted audio transcoding.
//!
//! The encoder, output extension, and container come from the per-format
//! table in [`crate::media`]; the bitrate comes from the byte budget spread
//! over the probed duration. Non-audio streams (cover art, video) are
//! stripped.

use crate::error::{CoreError, CoreResult};
use crate::external::ffprobe::FfprobeExecutor;
use crate::external::{FfmpegSpawner, ffmpeg, run_transcode};
use crate::media::AudioKind;
use crate::planning;
use crate::processing::JobResult;
use crate::registry::CancelHandle;
use std::path::Path;

pub fn compress_audio<S: FfmpegSpawner, P: FfprobeExecutor>(
    input: &Path,
    kind: AudioKind,
    target_bytes: u64,
    spawner: &S,
    prober: &P,
    cancel: &CancelHandle,
    on_progress: &mut dyn FnMut(u8),
) -> CoreResult<JobResult> {
    let probe = prober.probe(input)?;
    let duration = probe.duration_secs.filter(|d| *d > 0.0).ok_or_else(|| {
        CoreError::FfprobeParse(format!("no usable duration for {}", input.display()))
    })?;

    let bitrate = planning::plan_audio_bitrate(target_bytes, duration);
    let encoder = kind.encoder();
    let args = ffmpeg::audio_output_args(&encoder, bitrate);
    let output = crate::output::output_path(input, encoder.extension);

    log::info!(
        "Encoding {} -> {} ({} at {} kbps)",
        input.display(),
        output.display(),
        encoder.codec,
        bitrate
    );

    let outcome = run_transcode(
        spawner,
        input,
        &output,
        &args,
        Some(duration),
        cancel,
        on_progress,
    )?;
    if outcome.cancelled {
        return Ok(JobResult::Cancelled);
    }
    on_progress(100);
    Ok(JobResult::Completed { output })
}
