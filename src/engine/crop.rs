//! Center crop and resize.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Region of the source frame kept at a given zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Exclusive right edge.
    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn y2(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the rectangle covers the whole `width` x `height` frame.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Compute the centered crop window for a `width` x `height` frame.
///
/// The window is `width / zoom` by `height / zoom` (truncated), centered on
/// the frame center, and clamped to `[0, width] x [0, height]`. For any
/// non-empty frame the result satisfies `0 <= x < x2 <= width` and
/// `0 <= y < y2 <= height`. Zoom values below 1.0 or non-finite are treated
/// as 1.0.
pub fn crop_rect(width: u32, height: u32, zoom: f64) -> CropRect {
    let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };

    let crop_w = ((width as f64 / zoom) as u32).clamp(width.min(1), width);
    let crop_h = ((height as f64 / zoom) as u32).clamp(height.min(1), height);

    let x1 = (width / 2).saturating_sub(crop_w / 2);
    let y1 = (height / 2).saturating_sub(crop_h / 2);
    let x2 = x1.saturating_add(crop_w).min(width);
    let y2 = y1.saturating_add(crop_h).min(height);

    CropRect {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    }
}

/// Crop the center of `image` for `zoom` and scale it back to full size.
///
/// At zoom 1.0 the crop is the whole frame and the image is returned
/// unchanged.
pub fn magnify(image: &RgbImage, zoom: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    let rect = crop_rect(width, height, zoom);
    if rect.is_full(width, height) {
        return image.clone();
    }
    let cropped = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
    imageops::resize(&cropped, width, height, FilterType::Triangle)
}
