//! Sequential queue driver.
//!
//! Files are processed strictly in insertion order. A failure on one file is
//! recorded on its job and never aborts the rest of the queue. The driver
//! owns all registry status transitions; job functions only report progress
//! and their own result.

use crate::config::CompressionConfig;
use crate::error::CoreResult;
use crate::external::{self, FfmpegSpawner, FileMetadataProvider, ffprobe::FfprobeExecutor};
use crate::media::{ImageKind, MediaKind};
use crate::planning;
use crate::registry::{JobId, JobRegistry, JobStatus};
use std::path::PathBuf;

pub mod audio;
pub mod image;
pub mod video;

/// Result of one job's worker function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Completed { output: PathBuf },
    Cancelled,
}

/// Notifications emitted while the queue runs, keyed by job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    Started,
    Progress(u8),
    Finished(JobStatus),
}

/// Per-file result of a batch run.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub job_id: JobId,
    pub path: PathBuf,
    pub status: JobStatus,
    pub output: Option<PathBuf>,
    pub input_size: Option<u64>,
    pub output_size: Option<u64>,
}

/// Aggregate counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub cancelled: usize,
    pub errors: usize,
    pub unsupported: usize,
}

impl BatchSummary {
    fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Done => self.done += 1,
            JobStatus::Cancelled => self.cancelled += 1,
            JobStatus::Error => self.errors += 1,
            JobStatus::Unsupported => self.unsupported += 1,
            _ => {}
        }
    }

    /// Overall label: any cancellation marks the whole batch cancelled.
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.cancelled > 0 { "Cancelled" } else { "Done" }
    }
}

/// Everything a caller needs to render the end-of-run summary.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<CompressionOutcome>,
    pub summary: BatchSummary,
}

/// Processes every Ready job in the registry, in order.
pub fn process_files<S: FfmpegSpawner, P: FfprobeExecutor, M: FileMetadataProvider>(
    config: &CompressionConfig,
    spawner: &S,
    prober: &P,
    metadata: &M,
    registry: &mut JobRegistry,
    mut on_event: impl FnMut(JobId, JobEvent),
) -> CoreResult<BatchReport> {
    config.validate()?;

    // ffmpeg is only required when the batch actually contains av files.
    let needs_ffmpeg = registry.jobs().any(|job| {
        !job.status.is_terminal()
            && matches!(job.kind, Some(MediaKind::Video | MediaKind::Audio(_)))
    });
    if needs_ffmpeg {
        external::check_dependency("ffmpeg")?;
    }

    let target = planning::target_bytes(config.target_mb);
    let mut outcomes = Vec::new();
    let mut summary = BatchSummary::default();

    for id in registry.job_ids() {
        let Some(job) = registry.get(id) else {
            continue;
        };
        if job.status != JobStatus::Ready {
            continue;
        }
        let path = job.path.clone();
        let kind = job.kind;
        let cancel = job.cancel.clone();

        registry.set_status(id, JobStatus::Queued)?;

        let (status, output) = if cancel.is_requested() {
            registry.set_status(id, JobStatus::Cancelled)?;
            (JobStatus::Cancelled, None)
        } else if kind.is_none() {
            registry.set_message(id, "unrecognized media type")?;
            registry.set_status(id, JobStatus::Unsupported)?;
            (JobStatus::Unsupported, None)
        } else if kind == Some(MediaKind::Image(ImageKind::Gif)) {
            registry.set_message(id, "gif compression is not supported")?;
            registry.set_status(id, JobStatus::Unsupported)?;
            (JobStatus::Unsupported, None)
        } else {
            let kind = kind.unwrap_or(MediaKind::Video); // checked above
            registry.set_status(id, JobStatus::Processing)?;
            on_event(id, JobEvent::Started);

            let result = {
                let mut progress = |percent: u8| {
                    let _ = registry.set_progress(id, percent);
                    on_event(id, JobEvent::Progress(percent));
                };
                match kind {
                    MediaKind::Image(image_kind) => {
                        image::compress_image(&path, image_kind, target, &cancel, &mut progress)
                    }
                    MediaKind::Video => video::compress_video(
                        &path,
                        config,
                        spawner,
                        prober,
                        &cancel,
                        &mut progress,
                    ),
                    MediaKind::Audio(audio_kind) => audio::compress_audio(
                        &path,
                        audio_kind,
                        target,
                        spawner,
                        prober,
                        &cancel,
                        &mut progress,
                    ),
                }
            };

            match result {
                Ok(JobResult::Completed { output }) => {
                    registry.set_output(id, output.clone())?;
                    registry.set_status(id, JobStatus::Done)?;
                    (JobStatus::Done, Some(output))
                }
                Ok(JobResult::Cancelled) => {
                    registry.set_status(id, JobStatus::Cancelled)?;
                    (JobStatus::Cancelled, None)
                }
                Err(e) => {
                    log::error!("Failed to compress {}: {e}", path.display());
                    registry.set_message(id, e.to_string())?;
                    registry.set_status(id, JobStatus::Error)?;
                    (JobStatus::Error, None)
                }
            }
        };

        let input_size = metadata.get_size(&path).ok();
        let output_size = output
            .as_deref()
            .and_then(|p| metadata.get_size(p).ok());
        summary.record(status);
        on_event(id, JobEvent::Finished(status));
        outcomes.push(CompressionOutcome {
            job_id: id,
            path,
            status,
            output,
            input_size,
            output_size,
        });
    }

    log::info!(
        "Batch {}: {} done, {} cancelled, {} errors, {} unsupported",
        summary.label(),
        summary.done,
        summary.cancelled,
        summary.errors,
        summary.unsupported
    );
    Ok(BatchReport { outcomes, summary })
}
