//! FFmpeg command building and monitored execution.
//!
//! Argument builders are pure functions over the planning structures so the
//! exact command lines are unit-testable. Process management sits behind the
//! [`FfmpegSpawner`]/[`FfmpegProcess`] traits so the transcode contract
//! (progress mapping, cancellation, cleanup of partial output) can be
//! exercised with a scripted process; `SidecarSpawner` is the real
//! implementation backed by ffmpeg-sidecar.

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use crate::media::AudioEncoder;
use crate::planning::BitratePlan;
use crate::registry::CancelHandle;
use crate::utils::parse_ffmpeg_time;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel as FfmpegLogLevel};
use std::path::Path;
use std::process::ExitStatus;

/// Output arguments for a size-targeted h264 video encode.
#[must_use]
pub fn video_output_args(
    plan: &BitratePlan,
    fps: Option<u32>,
    scale_filter: Option<&str>,
) -> Vec<String> {
    let video = plan.video_kbps;
    let bufsize = (video * 2).max(2);

    let mut args: Vec<String> = vec![
        "-c:v".into(),
        "libx264".into(),
        "-b:v".into(),
        format!("{video}k"),
        "-maxrate".into(),
        format!("{video}k"),
        "-bufsize".into(),
        format!("{bufsize}k"),
        "-preset".into(),
        "fast".into(),
    ];

    if let Some(fps) = fps {
        args.push("-r".into());
        args.push(fps.to_string());
    }
    if let Some(filter) = scale_filter {
        args.push("-vf".into());
        args.push(filter.to_string());
    }

    if plan.copy_audio {
        args.push("-c:a".into());
        args.push("copy".into());
    } else {
        args.push("-c:a".into());
        args.push("aac".into());
        args.push("-b:a".into());
        args.push(format!("{}k", plan.audio_alloc_kbps));
    }

    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());
    args
}

/// Output arguments for an audio-only encode: first audio stream only,
/// video and attachments stripped.
#[must_use]
pub fn audio_output_args(encoder: &AudioEncoder, bitrate_kbps: u32) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-map".into(),
        "0:a:0".into(),
        "-vn".into(),
        "-c:a".into(),
        encoder.codec.into(),
    ];

    // PCM has no bitrate knob.
    if encoder.codec != "pcm_s16le" {
        args.push("-b:a".into());
        args.push(format!("{bitrate_kbps}k"));
    }
    if let Some(rate) = encoder.sample_rate {
        args.push("-ar".into());
        args.push(rate.to_string());
    }
    if let Some(container) = encoder.container {
        args.push("-f".into());
        args.push(container.into());
        if container == "mp4" {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
    }
    args
}

/// What an event handler wants done with the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Kill,
}

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Feeds every event to the handler; a `Kill` return terminates the
    /// process while the remaining events drain.
    fn handle_events(
        &mut self,
        handler: &mut dyn FnMut(FfmpegEvent) -> EventFlow,
    ) -> CoreResult<()>;

    /// Waits for the process to exit and returns its status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an [`FfmpegProcess`].
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// Wrapper around `ffmpeg_sidecar`'s child implementing [`FfmpegProcess`].
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events(
        &mut self,
        handler: &mut dyn FnMut(FfmpegEvent) -> EventFlow,
    ) -> CoreResult<()> {
        let events = self.0.iter().map_err(|e| {
            command_failed_error(
                "ffmpeg",
                ExitStatus::default(),
                format!("Failed to get event iterator: {e}"),
            )
        })?;
        let mut killed = false;
        for event in events {
            if handler(event) == EventFlow::Kill && !killed {
                killed = true;
                if let Err(e) = self.0.kill() {
                    log::warn!("Failed to kill ffmpeg after cancellation: {e}");
                }
            }
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// Concrete [`FfmpegSpawner`] using ffmpeg-sidecar.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

/// Result of a monitored transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// The run was cancelled; any partial output has been deleted.
    pub cancelled: bool,
}

/// Runs ffmpeg over the input with the given output arguments, reporting
/// percentage progress derived from the stream position.
///
/// Progress stays below 100 until the process has exited successfully; when
/// no duration is known a fixed 50% placeholder is reported instead. A
/// cancellation observed at any point, including after a successful exit,
/// wins: the output file is removed and `cancelled` is returned.
pub fn run_transcode<S: FfmpegSpawner>(
    spawner: &S,
    input: &Path,
    output: &Path,
    output_args: &[String],
    duration_secs: Option<f64>,
    cancel: &CancelHandle,
    on_progress: &mut dyn FnMut(u8),
) -> CoreResult<EncodeOutcome> {
    if cancel.is_requested() {
        return Ok(EncodeOutcome { cancelled: true });
    }

    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.input(input.to_string_lossy().as_ref());
    for arg in output_args {
        cmd.arg(arg);
    }
    cmd.overwrite();
    cmd.output(output.to_string_lossy().as_ref());

    log::debug!("Running ffmpeg: {cmd:?}");
    let mut process = spawner.spawn(cmd)?;

    let mut stderr_tail = String::new();
    let mut last_percent: u8 = 0;

    process.handle_events(&mut |event| {
        match event {
            FfmpegEvent::Progress(progress) => {
                let percent = progress_percent(&progress.time, duration_secs);
                if percent > last_percent {
                    last_percent = percent;
                    on_progress(percent);
                }
            }
            FfmpegEvent::Log(level, message) => {
                log::log!(
                    target: "ffmpeg_log",
                    map_ffmpeg_log_level(&level),
                    "{message}"
                );
            }
            FfmpegEvent::Error(message) => {
                if is_non_critical_ffmpeg_message(&message) {
                    log::debug!("ffmpeg non-critical message: {message}");
                } else {
                    log::warn!("ffmpeg stderr: {message}");
                    stderr_tail.push_str(&message);
                    stderr_tail.push('\n');
                }
            }
            _ => {}
        }
        if cancel.is_requested() {
            EventFlow::Kill
        } else {
            EventFlow::Continue
        }
    })?;

    let status = process.wait()?;

    // Cancellation wins even when the encode raced to completion.
    if cancel.is_requested() {
        remove_partial_output(output);
        return Ok(EncodeOutcome { cancelled: true });
    }

    if !status.success() {
        remove_partial_output(output);
        return Err(command_failed_error("ffmpeg", status, stderr_tail));
    }

    Ok(EncodeOutcome { cancelled: false })
}

/// Maps an ffmpeg stream position to a display percentage: capped at 99
/// until completion, 50 when the position or duration is unusable.
fn progress_percent(time: &str, duration_secs: Option<f64>) -> u8 {
    duration_secs
        .filter(|&d| d > 0.0)
        .and_then(|d| parse_ffmpeg_time(time).map(|t| (t / d * 100.0).round()))
        .map_or(50, |p| p.clamp(0.0, 99.0) as u8)
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            log::warn!("Failed to remove partial output {}: {e}", output.display());
        }
    }
}

fn map_ffmpeg_log_level(level: &FfmpegLogLevel) -> log::Level {
    match level {
        FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => log::Level::Error,
        FfmpegLogLevel::Warning => log::Level::Warn,
        FfmpegLogLevel::Info => log::Level::Debug,
        _ => log::Level::Trace,
    }
}

/// FFmpeg messages that show up on stderr without indicating a real problem.
fn is_non_critical_ffmpeg_message(message: &str) -> bool {
    message.contains("deprecated pixel format")
        || message.contains("No accelerated colorspace conversion")
        || message.contains("Stream map")
        || message.contains("automatically inserted filter")
        || message.contains("Timestamps are unset")
        || message.contains("does not match the corresponding codec")
        || message.contains("Queue input is backward")
        || message.contains("first frame is no keyframe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::media::AudioKind;
    use std::cell::RefCell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn joined(args: &[String]) -> String {
        args.join(" ")
    }

    #[test]
    fn test_video_args_reencode_audio() {
        let plan = BitratePlan {
            total_target_kbps: 140,
            audio_alloc_kbps: 17,
            video_kbps: 123,
            copy_audio: false,
        };
        let args = video_output_args(&plan, None, Some("scale=w:h"));
        let line = joined(&args);
        assert!(line.contains("-c:v libx264"));
        assert!(line.contains("-b:v 123k -maxrate 123k -bufsize 246k"));
        assert!(line.contains("-preset fast"));
        assert!(line.contains("-vf scale=w:h"));
        assert!(line.contains("-c:a aac -b:a 17k"));
        assert!(line.contains("-movflags +faststart"));
        assert!(line.contains("-pix_fmt yuv420p"));
        assert!(!line.contains("-r "));
    }

    #[test]
    fn test_video_args_copy_audio_and_fps() {
        let plan = BitratePlan {
            total_target_kbps: 5000,
            audio_alloc_kbps: 128,
            video_kbps: 4872,
            copy_audio: true,
        };
        let args = video_output_args(&plan, Some(30), None);
        let line = joined(&args);
        assert!(line.contains("-r 30"));
        assert!(line.contains("-c:a copy"));
        assert!(!line.contains("-b:a"));
        assert!(!line.contains("-vf"));
    }

    #[test]
    fn test_video_args_bufsize_floor() {
        let plan = BitratePlan {
            total_target_kbps: 17,
            audio_alloc_kbps: 1,
            video_kbps: 16,
            copy_audio: false,
        };
        let args = video_output_args(&plan, None, None);
        assert!(joined(&args).contains("-bufsize 32k"));
    }

    #[test]
    fn test_audio_args_lossy() {
        let args = audio_output_args(&AudioKind::Mp3.encoder(), 140);
        let line = joined(&args);
        assert!(line.starts_with("-map 0:a:0 -vn"));
        assert!(line.contains("-c:a libmp3lame -b:a 140k"));
        assert!(!line.contains("-f "));
        assert!(!line.contains("-movflags"));
    }

    #[test]
    fn test_audio_args_wav_has_no_bitrate() {
        let args = audio_output_args(&AudioKind::Wav.encoder(), 999);
        let line = joined(&args);
        assert!(line.contains("-c:a pcm_s16le"));
        assert!(line.contains("-ar 44100"));
        assert!(!line.contains("-b:a"));
    }

    #[test]
    fn test_audio_args_mp4_family_gets_faststart() {
        let args = audio_output_args(&AudioKind::M4a.encoder(), 128);
        let line = joined(&args);
        assert!(line.contains("-f mp4"));
        assert!(line.contains("-movflags +faststart"));
    }

    #[test]
    fn test_progress_percent_mapping() {
        assert_eq!(progress_percent("00:00:00", Some(60.0)), 0);
        assert_eq!(progress_percent("00:00:30", Some(60.0)), 50);
        // Stream position at or past the duration stays capped below 100.
        assert_eq!(progress_percent("00:01:00", Some(60.0)), 99);
        assert_eq!(progress_percent("00:02:00", Some(60.0)), 99);
        // No usable duration or position falls back to the 50% placeholder.
        assert_eq!(progress_percent("00:00:30", None), 50);
        assert_eq!(progress_percent("00:00:30", Some(0.0)), 50);
        assert_eq!(progress_percent("garbage", Some(60.0)), 50);
    }

    /// Scripted process: replays canned events, optionally flips the cancel
    /// flag after the nth event (simulating a user cancelling mid-encode),
    /// and records whether it was killed.
    struct FakeProcess {
        events: Vec<FfmpegEvent>,
        status: ExitStatus,
        cancel_after: Option<(usize, CancelHandle)>,
        killed: Arc<AtomicBool>,
    }

    impl FfmpegProcess for FakeProcess {
        fn handle_events(
            &mut self,
            handler: &mut dyn FnMut(FfmpegEvent) -> EventFlow,
        ) -> CoreResult<()> {
            for (index, event) in self.events.drain(..).enumerate() {
                if handler(event) == EventFlow::Kill {
                    self.killed.store(true, Ordering::SeqCst);
                }
                if let Some((after, handle)) = &self.cancel_after {
                    if index + 1 == *after {
                        handle.request();
                    }
                }
            }
            Ok(())
        }

        fn wait(&mut self) -> CoreResult<ExitStatus> {
            Ok(self.status)
        }
    }

    struct FakeSpawner(RefCell<Option<FakeProcess>>);

    impl FakeSpawner {
        fn with(process: FakeProcess) -> Self {
            Self(RefCell::new(Some(process)))
        }

        fn refusing() -> Self {
            Self(RefCell::new(None))
        }
    }

    impl FfmpegSpawner for FakeSpawner {
        type Process = FakeProcess;

        fn spawn(&self, _cmd: FfmpegCommand) -> CoreResult<Self::Process> {
            Ok(self
                .0
                .borrow_mut()
                .take()
                .expect("no process scripted for this spawn"))
        }
    }

    fn info_event(message: &str) -> FfmpegEvent {
        FfmpegEvent::Log(FfmpegLogLevel::Info, message.to_string())
    }

    #[cfg(unix)]
    fn failure_status() -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(256) // exit code 1
    }

    #[test]
    fn test_cancel_before_start_skips_spawn() {
        let cancel = CancelHandle::new();
        cancel.request();
        // The refusing spawner panics if spawn is ever reached.
        let outcome = run_transcode(
            &FakeSpawner::refusing(),
            Path::new("/nonexistent/in.mp4"),
            Path::new("/nonexistent/out.mp4"),
            &[],
            Some(10.0),
            &cancel,
            &mut |_| {},
        )
        .unwrap();
        assert!(outcome.cancelled);
    }

    #[test]
    fn test_cancel_wins_race_with_clean_exit() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip_compressed.mp4");
        std::fs::write(&output, b"encoded bytes").unwrap();

        let cancel = CancelHandle::new();
        // The flag flips after the final event: the process exits cleanly
        // before anyone could kill it, but the user already asked to stop.
        let spawner = FakeSpawner::with(FakeProcess {
            events: vec![info_event("last frame written")],
            status: ExitStatus::default(),
            cancel_after: Some((1, cancel.clone())),
            killed: Arc::new(AtomicBool::new(false)),
        });

        let outcome = run_transcode(
            &spawner,
            Path::new("clip.mov"),
            &output,
            &[],
            Some(10.0),
            &cancel,
            &mut |_| {},
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert!(!output.exists());
    }

    #[test]
    fn test_cancel_mid_encode_kills_process_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip_compressed.mp4");
        std::fs::write(&output, b"half an mp4").unwrap();

        let cancel = CancelHandle::new();
        let killed = Arc::new(AtomicBool::new(false));
        let spawner = FakeSpawner::with(FakeProcess {
            events: vec![info_event("frame 1"), info_event("frame 2")],
            status: ExitStatus::default(),
            cancel_after: Some((1, cancel.clone())),
            killed: killed.clone(),
        });

        let outcome = run_transcode(
            &spawner,
            Path::new("clip.mov"),
            &output,
            &[],
            Some(10.0),
            &cancel,
            &mut |_| {},
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert!(killed.load(Ordering::SeqCst));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr_and_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip_compressed.mp4");
        std::fs::write(&output, b"truncated").unwrap();

        let spawner = FakeSpawner::with(FakeProcess {
            events: vec![FfmpegEvent::Error("Conversion failed!".to_string())],
            status: failure_status(),
            cancel_after: None,
            killed: Arc::new(AtomicBool::new(false)),
        });

        let err = run_transcode(
            &spawner,
            Path::new("clip.mov"),
            &output,
            &[],
            Some(10.0),
            &CancelHandle::new(),
            &mut |_| {},
        )
        .unwrap_err();

        match err {
            CoreError::CommandFailed { stderr, .. } => {
                assert!(stderr.contains("Conversion failed!"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_critical_stderr_kept_out_of_error_tail() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip_compressed.mp4");
        std::fs::write(&output, b"truncated").unwrap();

        let spawner = FakeSpawner::with(FakeProcess {
            events: vec![
                FfmpegEvent::Error("Timestamps are unset in a packet".to_string()),
                FfmpegEvent::Error("Conversion failed!".to_string()),
            ],
            status: failure_status(),
            cancel_after: None,
            killed: Arc::new(AtomicBool::new(false)),
        });

        let err = run_transcode(
            &spawner,
            Path::new("clip.mov"),
            &output,
            &[],
            Some(10.0),
            &CancelHandle::new(),
            &mut |_| {},
        )
        .unwrap_err();
        match err {
            CoreError::CommandFailed { stderr, .. } => {
                assert!(stderr.contains("Conversion failed!"));
                assert!(!stderr.contains("Timestamps"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
