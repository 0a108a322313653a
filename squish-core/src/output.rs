//! Collision-free output path selection.
//!
//! Outputs land next to their input as `<stem>_compressed.<ext>`. Existing
//! files are never overwritten; a `-1`, `-2`, ... suffix is appended until a
//! free name is found.

use std::path::{Path, PathBuf};

/// Picks the output path for an input file and output extension (with or
/// without a leading dot).
#[must_use]
pub fn output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let ext = extension.strip_prefix('.').unwrap_or(extension);

    let mut candidate = parent.join(format!("{stem}_compressed.{ext}"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = parent.join(format!("{stem}_compressed-{counter}.{ext}"));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_basic_naming() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        File::create(&input).unwrap();

        let out = output_path(&input, "mp4");
        assert_eq!(out, dir.path().join("clip_compressed.mp4"));
    }

    #[test]
    fn test_leading_dot_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        let out = output_path(&input, ".mp3");
        assert_eq!(out, dir.path().join("song_compressed.mp3"));
    }

    #[test]
    fn test_collisions_increment() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        File::create(&input).unwrap();
        File::create(dir.path().join("photo_compressed.png")).unwrap();
        File::create(dir.path().join("photo_compressed-1.png")).unwrap();

        let out = output_path(&input, "png");
        assert_eq!(out, dir.path().join("photo_compressed-2.png"));
    }

    #[test]
    fn test_extension_change_avoids_collision_only_on_same_ext() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        File::create(dir.path().join("clip_compressed.mkv")).unwrap();

        // Output extension differs, so the base name is still free.
        let out = output_path(&input, "mp4");
        assert_eq!(out, dir.path().join("clip_compressed.mp4"));
    }
}
