use backdrop_core::TransformSpec;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Calculate target dimensions for a spec.
    ///
    /// A single dimension keeps the aspect ratio; both dimensions are taken
    /// as the exact output size.
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        spec: &TransformSpec,
    ) -> (u32, u32) {
        match (spec.width, spec.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let aspect_ratio = orig_height as f32 / orig_width as f32;
                let h = (w as f32 * aspect_ratio).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let aspect_ratio = orig_width as f32 / orig_height as f32;
                let w = (h as f32 * aspect_ratio).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Smallest libjpeg decode scale (`n/8`) whose output still covers
    /// `target` in both directions. Never scales up.
    pub fn dct_scale_numerator(source: (u32, u32), target: (u32, u32)) -> u8 {
        let (src_w, src_h) = (source.0 as u64, source.1 as u64);
        let (dst_w, dst_h) = (target.0 as u64, target.1 as u64);
        (1..=8u8)
            .find(|&n| src_w * n as u64 >= dst_w * 8 && src_h * n as u64 >= dst_h * 8)
            .unwrap_or(8)
    }

    /// Resize to `target`, which was computed from the original dimensions
    /// (the decoder may already have scaled the image down). With both
    /// dimensions set the image is scaled to cover the box and the overflow is
    /// cropped evenly from both sides.
    pub fn resize_to(img: DynamicImage, target: (u32, u32), spec: &TransformSpec) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) = target;

        if (target_width, target_height) == (orig_width, orig_height) {
            return img;
        }

        let filter = Self::select_filter(orig_width, orig_height, target_width, target_height);

        match (spec.width, spec.height) {
            (Some(_), Some(_)) => img.resize_to_fill(target_width, target_height, filter),
            _ => img.resize_exact(target_width, target_height, filter),
        }
    }
}
