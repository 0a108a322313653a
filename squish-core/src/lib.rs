//! Core library for squish, a size-targeting media compression engine.
//!
//! Inputs are classified as image, video, or audio; a pure planning layer
//! turns the megabyte target into bitrates or an image quality ladder; and
//! the processing layer drives ffmpeg (video/audio) or in-process image
//! encoders through a sequential job queue with progress reporting and
//! cooperative cancellation.
//!
//! The typical flow:
//!
//! 1. Build a [`CompressionConfig`] and add files to a [`JobRegistry`].
//! 2. Call [`process_files`] with an ffmpeg spawner, an ffprobe executor,
//!    and a metadata provider (use [`external::SidecarSpawner`],
//!    [`external::CrateFfprobeExecutor`], and
//!    [`external::StdFsMetadataProvider`] outside of tests).
//! 3. Render the returned [`BatchReport`].

pub mod config;
pub mod error;
pub mod external;
pub mod media;
pub mod output;
pub mod planning;
pub mod processing;
pub mod registry;
pub mod utils;

pub use config::{CompressionConfig, Priority};
pub use error::{CoreError, CoreResult};
pub use media::{AudioKind, ImageKind, MediaKind};
pub use planning::{BitratePlan, ImagePass, ResolutionCap};
pub use processing::{
    BatchReport, BatchSummary, CompressionOutcome, JobEvent, process_files,
};
pub use registry::{CancelHandle, JobId, JobRegistry, JobState, JobStatus};
pub use utils::{
    calculate_size_reduction, format_bytes, format_duration, get_filename_safe, parse_ffmpeg_time,
};
