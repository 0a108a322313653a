//! Image compression via the quality/resize ladder.
//!
//! The source is decoded once, then re-encoded in-memory with increasingly
//! aggressive quality and width settings until the result fits the byte
//! target. The final attempt writes its result regardless of size so the
//! user always gets a best-effort file.

use crate::error::{CoreError, CoreResult};
use crate::media::ImageKind;
use crate::planning::{ImagePass, png_compression_level};
use crate::processing::JobResult;
use crate::registry::CancelHandle;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;

pub fn compress_image(
    input: &Path,
    kind: ImageKind,
    target_bytes: u64,
    cancel: &CancelHandle,
    on_progress: &mut dyn FnMut(u8),
) -> CoreResult<JobResult> {
    if kind == ImageKind::Gif {
        return Err(CoreError::Unsupported(format!(
            "gif compression is not supported: {}",
            input.display()
        )));
    }

    let source = image::open(input)?;
    let source_width = source.width();
    let output = crate::output::output_path(input, kind.extension());

    let mut pass = ImagePass::first();
    loop {
        if cancel.is_requested() {
            return Ok(JobResult::Cancelled);
        }

        let resized;
        let frame: &DynamicImage = match pass.width {
            Some(width) if width < source_width => {
                let height = ((f64::from(source.height()) * f64::from(width)
                    / f64::from(source_width))
                .round() as u32)
                    .max(1);
                resized = source.resize_exact(width, height, FilterType::Lanczos3);
                &resized
            }
            _ => &source,
        };

        let encoded = encode_pass(frame, kind, &pass)?;
        log::debug!(
            "image pass {} for {}: quality={} width={:?} -> {} bytes (target {})",
            pass.pass,
            input.display(),
            pass.quality,
            pass.width,
            encoded.len(),
            target_bytes
        );

        if encoded.len() as u64 <= target_bytes || pass.is_last() {
            if cancel.is_requested() {
                return Ok(JobResult::Cancelled);
            }
            std::fs::write(&output, &encoded)?;
            on_progress(100);
            return Ok(JobResult::Completed { output });
        }

        on_progress(pass.progress_percent());
        pass = pass.next(source_width);
    }
}

fn encode_pass(frame: &DynamicImage, kind: ImageKind, pass: &ImagePass) -> CoreResult<Vec<u8>> {
    let mut buffer = Vec::new();
    match kind {
        ImageKind::Jpeg => {
            let flattened;
            let opaque = if frame.color().has_alpha() {
                flattened = flatten_onto_white(frame);
                &flattened
            } else {
                frame
            };
            opaque.write_with_encoder(JpegEncoder::new_with_quality(
                &mut Cursor::new(&mut buffer),
                pass.quality,
            ))?;
        }
        ImageKind::Png => {
            let compression = match png_compression_level(pass.pass) {
                7..=9 => CompressionType::Best,
                4..=6 => CompressionType::Default,
                _ => CompressionType::Fast,
            };
            frame.write_with_encoder(PngEncoder::new_with_quality(
                &mut Cursor::new(&mut buffer),
                compression,
                PngFilterType::Adaptive,
            ))?;
        }
        // The encoder is lossless; the resize ladder carries the reduction.
        ImageKind::WebP => {
            frame
                .to_rgba8()
                .write_with_encoder(WebPEncoder::new_lossless(&mut Cursor::new(&mut buffer)))?;
        }
        ImageKind::Bmp | ImageKind::Tiff => {
            frame.write_to(&mut Cursor::new(&mut buffer), kind.format())?;
        }
        ImageKind::Gif => {
            return Err(CoreError::Unsupported("gif".to_string()));
        }
    }
    Ok(buffer)
}

/// Reads image dimensions from the header without decoding pixel data.
pub fn image_dimensions(path: &Path) -> CoreResult<(u32, u32)> {
    Ok(image::image_dimensions(path)?)
}

/// Composites an image with alpha onto a white background for formats
/// without transparency.
fn flatten_onto_white(frame: &DynamicImage) -> DynamicImage {
    let rgba = frame.to_rgba8();
    let mut rgb = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        let blend =
            |channel: u8| (f32::from(channel) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(
            x,
            y,
            image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }
    DynamicImage::ImageRgb8(rgb)
}
