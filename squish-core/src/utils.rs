//! Utility functions for formatting and file operations.
//!
//! General-purpose helpers used throughout the squish-core library:
//! duration and byte formatting, ffmpeg time parsing, and path helpers.

use std::path::Path;

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Parses FFmpeg time string (HH:MM:SS.MS) to seconds. Returns None if invalid.
#[must_use]
pub fn parse_ffmpeg_time(time: &str) -> Option<f64> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() == 3 {
        let hours = parts[0].parse::<f64>().ok()?;
        let minutes = parts[1].parse::<f64>().ok()?;
        let seconds = parts[2].parse::<f64>().ok()?;
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    } else {
        None
    }
}

/// Safely extracts filename from a path with consistent error handling.
/// Returns the filename as a String, or an error if the path has no filename component.
pub fn get_filename_safe(path: &Path) -> crate::CoreResult<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| {
            crate::CoreError::PathError(format!("Failed to get filename for {}", path.display()))
        })?
        .to_string_lossy()
        .to_string())
}

/// Calculates the percentage size reduction from input to output.
/// Returns 0 if input_size is 0 to avoid division by zero.
#[must_use]
pub fn calculate_size_reduction(input_size: u64, output_size: u64) -> u64 {
    if input_size == 0 {
        0
    } else if output_size >= input_size {
        0 // No reduction if output is larger
    } else {
        100 - ((output_size * 100) / input_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_for_elapsed_display() {
        // Typical elapsed times for a batch run.
        assert_eq!(format_duration(4.8), "00:00:04");
        assert_eq!(format_duration(754.0), "00:12:34");
        assert_eq!(format_duration(3725.0), "01:02:05");
        // Anything unusable renders as placeholders instead of panicking.
        assert_eq!(format_duration(-0.5), "??:??:??");
        assert_eq!(format_duration(f64::NAN), "??:??:??");
    }

    #[test]
    fn test_format_bytes_picks_binary_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(8 * 1024 * 1024), "8.00 MiB");
        assert_eq!(format_bytes(1_572_864), "1.50 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
        // Just under a unit boundary stays in the smaller unit.
        assert_eq!(format_bytes(1024 * 1024 - 1), "1024.00 KiB");
    }

    #[test]
    fn test_parse_ffmpeg_time_matches_progress_lines() {
        // Timemarks as ffmpeg prints them in progress output.
        assert_eq!(parse_ffmpeg_time("00:00:30.08"), Some(30.08));
        assert_eq!(parse_ffmpeg_time("01:02:03"), Some(3723.0));
        // ffmpeg reports "N/A" before the first frame lands.
        assert_eq!(parse_ffmpeg_time("N/A"), None);
        assert_eq!(parse_ffmpeg_time("00:30"), None);
        assert_eq!(parse_ffmpeg_time(""), None);
    }

    #[test]
    fn test_get_filename_safe() {
        assert_eq!(
            get_filename_safe(Path::new("/downloads/holiday clip.mov")).unwrap(),
            "holiday clip.mov"
        );
        assert!(get_filename_safe(Path::new("/")).is_err());
    }

    #[test]
    fn test_size_reduction_never_reports_growth() {
        assert_eq!(calculate_size_reduction(10_000_000, 7_900_000), 21);
        assert_eq!(calculate_size_reduction(1000, 999), 1);
        // Grown or unchanged output shows as zero reduction.
        assert_eq!(calculate_size_reduction(1000, 1000), 0);
        assert_eq!(calculate_size_reduction(1000, 1500), 0);
        assert_eq!(calculate_size_reduction(0, 100), 0);
    }
}
