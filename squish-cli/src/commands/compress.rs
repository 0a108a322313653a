//! The `compress` command: queue files, run them sequentially, and print a
//! per-file summary.

use crate::output::{
    print_heading, print_info, print_section, print_success, print_warning,
};
use crate::prefs::{self, Preferences};
use indicatif::{ProgressBar, ProgressStyle};
use squish_core::external::{CrateFfprobeExecutor, SidecarSpawner, StdFsMetadataProvider};
use squish_core::{
    CoreError, JobEvent, JobRegistry, JobStatus, Priority, ResolutionCap,
    calculate_size_reduction, format_bytes, format_duration, get_filename_safe, process_files,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

#[derive(clap::Args, Debug)]
pub struct CompressArgs {
    /// Files to compress
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Target output size in megabytes
    #[arg(short = 's', long = "size", value_name = "MB")]
    pub size_mb: Option<f64>,

    /// Bitrate priority for video files: video, audio, or balanced
    #[arg(long, value_name = "PRIORITY")]
    pub priority: Option<Priority>,

    /// Maximum video resolution: 64p, 144p, 240p, 360p, 480p, 720p, 1080p, or auto
    #[arg(long, value_name = "RES")]
    pub resolution: Option<ResolutionCap>,

    /// Output frame rate for video files (clamped to 1-120)
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Persist the resolved settings as future defaults
    #[arg(long)]
    pub save_defaults: bool,
}

pub fn execute(args: CompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stored = prefs::load();
    let config = stored.resolve(args.size_mb, args.priority, args.resolution, args.fps);
    config.validate()?;

    if args.save_defaults {
        prefs::save(&Preferences::from_config(&config))?;
        print_success("Saved settings as defaults");
    }

    let mut registry = JobRegistry::new();
    let mut names: HashMap<_, String> = HashMap::new();
    for file in &args.files {
        if !file.is_file() {
            print_warning(&format!("{}: not a file, skipping", file.display()));
            continue;
        }
        match registry.add(file) {
            Ok(id) => {
                let name = get_filename_safe(file).unwrap_or_else(|_| file.display().to_string());
                names.insert(id, name);
            }
            Err(e) => print_warning(&e.to_string()),
        }
    }
    if registry.jobs().next().is_none() {
        return Err(Box::new(CoreError::PathError(
            "no usable input files".to_string(),
        )));
    }

    print_heading("Compressing");
    print_info("Files", registry.jobs().count());
    print_info("Target size", format!("{} MB", config.target_mb));
    print_info("Priority", config.priority);
    print_info("Resolution cap", config.resolution);
    if let Some(fps) = config.fps {
        print_info("Frame rate", fps);
    }
    println!();

    let started = Instant::now();
    let mut active_bar: Option<ProgressBar> = None;
    let report = process_files(
        &config,
        &SidecarSpawner,
        &CrateFfprobeExecutor::new(),
        &StdFsMetadataProvider,
        &mut registry,
        |id, event| match event {
            JobEvent::Started => {
                let bar = ProgressBar::new(100);
                bar.set_style(
                    ProgressStyle::with_template("{msg:24!} [{bar:40}] {percent:>3}%")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar.set_message(names.get(&id).cloned().unwrap_or_default());
                active_bar = Some(bar);
            }
            JobEvent::Progress(percent) => {
                if let Some(bar) = &active_bar {
                    bar.set_position(u64::from(percent));
                }
            }
            JobEvent::Finished(_) => {
                if let Some(bar) = active_bar.take() {
                    bar.finish_and_clear();
                }
            }
        },
    )?;

    print_section("Summary");
    for outcome in &report.outcomes {
        let name = names
            .get(&outcome.job_id)
            .cloned()
            .unwrap_or_else(|| outcome.path.display().to_string());
        match outcome.status {
            JobStatus::Done => {
                let before = outcome
                    .input_size
                    .map_or_else(|| "?".to_string(), format_bytes);
                let after = outcome
                    .output_size
                    .map_or_else(|| "?".to_string(), format_bytes);
                let reduction = match (outcome.input_size, outcome.output_size) {
                    (Some(input), Some(output)) => {
                        format!(" (-{}%)", calculate_size_reduction(input, output))
                    }
                    _ => String::new(),
                };
                let destination = outcome
                    .output
                    .as_ref()
                    .map_or_else(String::new, |p| format!(" -> {}", p.display()));
                print_success(&format!("{name}: {before} -> {after}{reduction}{destination}"));
            }
            JobStatus::Cancelled => print_warning(&format!("{name}: cancelled")),
            status => {
                let detail = registry
                    .get(outcome.job_id)
                    .and_then(|job| job.message.clone())
                    .unwrap_or_else(|| status.to_string());
                crate::output::print_error(&format!("{name}: {detail}"));
            }
        }
    }

    println!();
    print_info("Result", report.summary.label());
    print_info(
        "Finished",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    );
    print_info("Elapsed", format_duration(started.elapsed().as_secs_f64()));
    Ok(())
}
