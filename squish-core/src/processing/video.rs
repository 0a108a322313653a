//! Size-targeted video transcoding.
//!
//! Probes the source, splits the byte budget into audio and video bitrates,
//! and hands a single-pass libx264 encode to the monitored ffmpeg runner.
//! Output is always an mp4.

use crate::config::CompressionConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::ffprobe::FfprobeExecutor;
use crate::external::{FfmpegSpawner, ffmpeg, run_transcode};
use crate::planning;
use crate::processing::JobResult;
use crate::registry::CancelHandle;
use std::path::Path;

pub fn compress_video<S: FfmpegSpawner, P: FfprobeExecutor>(
    input: &Path,
    config: &CompressionConfig,
    spawner: &S,
    prober: &P,
    cancel: &CancelHandle,
    on_progress: &mut dyn FnMut(u8),
) -> CoreResult<JobResult> {
    let probe = prober.probe(input)?;
    let duration = probe.duration_secs.filter(|d| *d > 0.0).ok_or_else(|| {
        CoreError::FfprobeParse(format!("no usable duration for {}", input.display()))
    })?;

    let target = planning::target_bytes(config.target_mb);
    let plan = planning::plan_video_bitrates(
        target,
        duration,
        probe.audio_bitrate_kbps,
        probe.audio_codec.as_deref(),
        config.priority,
    );

    let (max_width, max_height) = config.resolution.bounding_box();
    let scale = planning::scale_filter(max_width, max_height);
    let fps = config.fps.map(planning::clamp_fps);
    let args = ffmpeg::video_output_args(&plan, fps, Some(&scale));
    let output = crate::output::output_path(input, "mp4");

    log::info!(
        "Encoding {} -> {} ({} kbps video, {} kbps audio{})",
        input.display(),
        output.display(),
        plan.video_kbps,
        plan.audio_alloc_kbps,
        if plan.copy_audio { ", audio copied" } else { "" }
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
