//! Image transformer - decode, resize, encode
//!
//! Synchronous and CPU-bound; callers on the async runtime must run it on
//! the blocking pool.

use std::any::Any;
use std::io::{BufRead, Cursor, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use backdrop_core::TransformSpec;
use image::{DynamicImage, GenericImageView, ImageReader, Limits, RgbImage};
use mozjpeg::ColorSpace;

use crate::compression::ImageCompressor;
use crate::error::TransformError;
use crate::image::resize::ImageResize;

/// SOI marker followed by the first marker prefix
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Dimensions of the source and of what was written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOutcome {
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
}

pub struct ImageTransformer;

impl ImageTransformer {
    /// Decode encoded bytes, refusing images that exceed `limits`.
    pub fn decode(data: &[u8], limits: Limits) -> Result<DynamicImage, TransformError> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(format!("Failed to detect format: {}", e)))?;
        reader.limits(limits);

        reader
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))
    }

    /// Decode a JPEG as it is read, letting libjpeg downscale while decoding
    /// so the result is no larger than needed for `spec`.
    ///
    /// Returns the decoded image and the dimensions of the original.
    pub fn decode_jpeg<R: BufRead>(
        reader: R,
        spec: &TransformSpec,
        limits: &Limits,
    ) -> Result<(DynamicImage, (u32, u32)), TransformError> {
        // libjpeg reports errors, including failed reads, by unwinding
        let decoded = panic::catch_unwind(AssertUnwindSafe(move || {
            let mut decompress = mozjpeg::Decompress::new_reader(reader)
                .map_err(|e| TransformError::Decode(format!("Invalid JPEG header: {}", e)))?;
            let (width, height) = (decompress.width() as u32, decompress.height() as u32);
            check_dimensions(width, height, limits)?;

            let target = ImageResize::calculate_dimensions(width, height, spec);
            decompress.scale(ImageResize::dct_scale_numerator((width, height), target));

            // libjpeg has no CMYK to RGB conversion
            let cmyk = matches!(
                decompress.color_space(),
                ColorSpace::JCS_CMYK | ColorSpace::JCS_YCCK
            );
            let started = if cmyk {
                decompress.to_colorspace(ColorSpace::JCS_CMYK)
            } else {
                decompress.rgb()
            };
            let mut started = started
                .map_err(|e| TransformError::Decode(format!("Failed to start JPEG decode: {}", e)))?;
            let (out_width, out_height) = (started.width() as u32, started.height() as u32);
            let channels = if cmyk { 4 } else { 3 };
            check_allocation(out_width as u64 * out_height as u64 * channels, limits)?;

            let pixels = started
                .read_scanlines::<u8>()
                .map_err(|e| TransformError::Decode(format!("Failed to read JPEG scanlines: {}", e)))?;
            let pixels = if cmyk { cmyk_to_rgb(&pixels) } else { pixels };
            let img = RgbImage::from_raw(out_width, out_height, pixels).ok_or_else(|| {
                TransformError::Decode("JPEG decoder returned a short image".to_string())
            })?;

            Ok((DynamicImage::ImageRgb8(img), (width, height)))
        }));

        match decoded {
            Ok(result) => result,
            Err(payload) => Err(TransformError::Decode(panic_message(payload))),
        }
    }

    /// Run the full transform, reading the source from `reader` and writing
    /// encoded output into `writer`.
    ///
    /// JPEG sources are decoded straight off the reader. Other formats are
    /// read to the end first. The writer is returned so the caller can
    /// finalize it.
    pub fn transform<R: BufRead, W: Write>(
        mut reader: R,
        spec: &TransformSpec,
        limits: Limits,
        writer: W,
    ) -> Result<(TransformOutcome, W), TransformError> {
        let mut header = Vec::with_capacity(JPEG_SIGNATURE.len());
        reader
            .by_ref()
            .take(JPEG_SIGNATURE.len() as u64)
            .read_to_end(&mut header)
            .map_err(|e| TransformError::Decode(format!("Failed to read source: {}", e)))?;

        let (img, (source_width, source_height)) = if header == JPEG_SIGNATURE {
            Self::decode_jpeg(Cursor::new(header).chain(reader), spec, &limits)?
        } else {
            let mut data = header;
            reader
                .read_to_end(&mut data)
                .map_err(|e| TransformError::Decode(format!("Failed to read source: {}", e)))?;
            drop(reader);
            let img = Self::decode(&data, limits)?;
            let dimensions = img.dimensions();
            (img, dimensions)
        };

        let target = ImageResize::calculate_dimensions(source_width, source_height, spec);
        let resized = ImageResize::resize_to(img, target, spec);
        let (width, height) = resized.dimensions();

        tracing::debug!(
            source_width,
            source_height,
            width,
            height,
            format = %spec.format,
            "Encoding image"
        );

        let writer = ImageCompressor::compress(&resized, spec.format, writer)
            .map_err(|e| TransformError::Encode(e.to_string()))?;

        let outcome = TransformOutcome {
            source_width,
            source_height,
            width,
            height,
        };
        Ok((outcome, writer))
    }
}

fn check_dimensions(width: u32, height: u32, limits: &Limits) -> Result<(), TransformError> {
    let too_wide = limits.max_image_width.is_some_and(|max| width > max);
    let too_tall = limits.max_image_height.is_some_and(|max| height > max);
    if too_wide || too_tall {
        return Err(TransformError::Decode(format!(
            "Image dimensions {}x{} exceed decoder limits",
            width, height
        )));
    }
    Ok(())
}

fn check_allocation(bytes: u64, limits: &Limits) -> Result<(), TransformError> {
    if limits.max_alloc.is_some_and(|max| bytes > max) {
        return Err(TransformError::Decode(format!(
            "Decoded image needs {} bytes, over the decoder allocation limit",
            bytes
        )));
    }
    Ok(())
}

/// Inverted CMYK, as libjpeg hands it out for Adobe files
fn cmyk_to_rgb(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks_exact(4)
        .flat_map(|p| {
            let k = p[3] as u16;
            [
                (p[0] as u16 * k / 255) as u8,
                (p[1] as u16 * k / 255) as u8,
                (p[2] as u16 * k / 255) as u8,
            ]
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "JPEG decoder failed".to_string()),
    }
}
