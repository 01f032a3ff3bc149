//! Test fixtures: photos generated with the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// A JPEG with a gradient, so resizing produces non-trivial output.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode fixture jpeg");
    buf
}

/// Decode a response body and return its dimensions.
pub fn dimensions(bytes: &[u8], format: ImageFormat) -> (u32, u32) {
    let img = image::load_from_memory_with_format(bytes, format).expect("decode response image");
    (img.width(), img.height())
}
