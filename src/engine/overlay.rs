//! FPS text drawn directly into the frame.
//!
//! A 3x5 bitmap font covering only the characters of `FPS: 12.3`.

use image::{Rgb, RgbImage};

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;
const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        _ => [0; 5],
    }
}

/// Text shown for a rate, matching the one-decimal format of the window title.
pub fn fps_label(rate: f64) -> String {
    format!("FPS: {:.1}", rate)
}

/// Draw `text` with its top-left corner at (`x`, `y`), each font pixel
/// scaled to `scale` x `scale`, over a black box. Clipped to the image.
pub fn draw_text(image: &mut RgbImage, x: u32, y: u32, scale: u32, text: &str) {
    let scale = scale.max(1);
    let advance = (GLYPH_W + 1) * scale;
    let box_w = advance * text.chars().count() as u32 + scale;
    let box_h = (GLYPH_H + 2) * scale;
    fill(image, x, y, box_w, box_h, BACKGROUND);

    for (i, c) in text.chars().enumerate() {
        let gx = x + scale + advance * i as u32;
        let gy = y + scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                    fill(
                        image,
                        gx + col * scale,
                        gy + row as u32 * scale,
                        scale,
                        scale,
                        TEXT_COLOR,
                    );
                }
            }
        }
    }
}

/// Stamp the FPS label in the top-left corner, sized to the frame height.
pub fn draw_fps(image: &mut RgbImage, rate: f64) {
    let scale = (image.height() / 120).max(1);
    draw_text(image, 10, 10, scale, &fps_label(rate));
}

fn fill(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(image.width());
    let y_end = y.saturating_add(h).min(image.height());
    for py in y.min(y_end)..y_end {
        for px in x.min(x_end)..x_end {
            image.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_label_format() {
        assert_eq!(fps_label(12.345), "FPS: 12.3");
        assert_eq!(fps_label(0.0), "FPS: 0.0");
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut image = RgbImage::from_pixel(40, 10, Rgb([255, 255, 255]));
        draw_text(&mut image, 0, 0, 1, "1");
        // Box is black, the glyph stem of '1' is green.
        assert_eq!(image.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(image.get_pixel(2, 1), &TEXT_COLOR);
        // Outside the box is untouched.
        assert_eq!(image.get_pixel(39, 9), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_clips_at_edges() {
        let mut image = RgbImage::new(8, 4);
        draw_fps(&mut image, 99.9);
        draw_text(&mut image, 100, 100, 3, "FPS");
        assert_eq!(image.dimensions(), (8, 4));
    }
}
