use std::io::Write;

use anyhow::Result;
use backdrop_core::OutputFormat;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GenericImageView};

/// mozjpeg quality (0-100), progressive scan
pub const JPEG_QUALITY: f32 = 80.0;
/// libwebp lossy quality (0-100)
pub const WEBP_QUALITY: f32 = 80.0;
/// ravif quality (0-100)
pub const AVIF_QUALITY: f32 = 70.0;
/// ravif speed, 1 (slow, small) to 10 (fast)
pub const AVIF_SPEED: u8 = 6;

/// Encodes a decoded image into one of the output formats.
///
/// Every encoder writes into a caller-supplied sink and hands it back on
/// success so the caller can flush or finalize it.
pub struct ImageCompressor;

impl ImageCompressor {
    pub fn compress<W: Write>(img: &DynamicImage, format: OutputFormat, writer: W) -> Result<W> {
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, writer),
            OutputFormat::Png => Self::compress_png(img, writer),
            OutputFormat::WebP => Self::compress_webp(img, writer),
            OutputFormat::Avif => Self::compress_avif(img, writer),
        }
    }

    /// Compress to JPEG using mozjpeg. Scanlines are written as they are
    /// compressed, so output reaches the sink before the image is done.
    fn compress_jpeg<W: Write>(img: &DynamicImage, writer: W) -> Result<W> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(JPEG_QUALITY);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(writer)?;
        comp.write_scanlines(&rgb_img)?;
        let writer = comp.finish()?;

        Ok(writer)
    }

    /// Compress to PNG with the default compression level
    fn compress_png<W: Write>(img: &DynamicImage, mut writer: W) -> Result<W> {
        img.write_with_encoder(PngEncoder::new(&mut writer))?;
        Ok(writer)
    }

    /// Compress to WebP. libwebp encodes into its own buffer, which is then
    /// copied out.
    fn compress_webp<W: Write>(img: &DynamicImage, mut writer: W) -> Result<W> {
        let (width, height) = img.dimensions();

        // Convert to RGBA for WebP encoding
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(WEBP_QUALITY);

        writer.write_all(&webp_data)?;
        Ok(writer)
    }

    /// Compress to AVIF. Like WebP, the whole file is produced before any
    /// byte is written.
    fn compress_avif<W: Write>(img: &DynamicImage, mut writer: W) -> Result<W> {
        let (width, height) = img.dimensions();

        let rgb_img = img.to_rgb8();
        let rgb_data: Vec<rgb::RGB8> = rgb_img
            .as_raw()
            .chunks_exact(3)
            .map(|chunk| rgb::RGB8::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        let img_buf = ravif::Img::new(rgb_data.as_slice(), width as usize, height as usize);

        let encoder = ravif::Encoder::new()
            .with_quality(AVIF_QUALITY)
            .with_speed(AVIF_SPEED);

        let avif_data = encoder.encode_rgb(img_buf)?;

        writer.write_all(&avif_data.avif_file)?;
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, 128])
        }))
    }

    fn encode(format: OutputFormat) -> Vec<u8> {
        ImageCompressor::compress(&sample_image(), format, Vec::new()).unwrap()
    }

    #[test]
    fn test_compress_jpeg_signature() {
        let out = encode(OutputFormat::Jpeg);
        assert_eq!(&out[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_compress_png_signature() {
        let out = encode(OutputFormat::Png);
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_compress_webp_signature() {
        let out = encode(OutputFormat::WebP);
        assert_eq!(&out[..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn test_compress_avif_signature() {
        let out = encode(OutputFormat::Avif);
        assert_eq!(&out[4..8], b"ftyp");
    }

    #[test]
    fn test_compress_jpeg_is_deterministic() {
        let img = sample_image();
        let a = ImageCompressor::compress(&img, OutputFormat::Jpeg, Vec::new()).unwrap();
        let b = ImageCompressor::compress(&img, OutputFormat::Jpeg, Vec::new()).unwrap();
        assert_eq!(a, b);
    }
}
