//! Raster output: pixel buffer, diagonal gradient, text, PNG encoding.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageResult, Rgba, RgbaImage};

use crate::glyph::{FontCache, GlyphSpec};
use crate::palette::{BackgroundMode, ColorPair};

/// Paints the background. Gradient mode interpolates from `primary` at the
/// top-left corner towards `secondary` at the bottom-right with
/// `ratio = (x + y) / (2 * size)`, truncating each channel.
pub fn fill_background(size: u32, colors: &ColorPair, mode: BackgroundMode) -> RgbaImage {
    match mode {
        BackgroundMode::Solid => RgbaImage::from_pixel(size, size, colors.primary.to_rgba()),
        BackgroundMode::Gradient => {
            let from = colors.primary.to_rgba();
            let to = colors.secondary.to_rgba();
            let span = 2.0 * size as f64;

            RgbaImage::from_fn(size, size, |x, y| {
                let ratio = (x + y) as f64 / span;
                let lerp = |a: u8, b: u8| (a as f64 * (1.0 - ratio) + b as f64 * ratio) as u8;
                Rgba([lerp(from[0], to[0]), lerp(from[1], to[1]), lerp(from[2], to[2]), 255])
            })
        }
    }
}

/// Draws `glyph` centered on the canvas. Does nothing when no font is loaded.
pub fn draw_text(canvas: &mut RgbaImage, glyph: &GlyphSpec, fonts: &FontCache) {
    let Some(face) = fonts.face(glyph.font_size_px) else {
        tracing::debug!(text = %glyph.text, "no font loaded, skipping text");
        return;
    };

    let color = glyph.fill.to_rgba();
    let (width, height) = canvas.dimensions();

    for positioned in face.layout_centered(width, &glyph.text) {
        let Some(bb) = positioned.pixel_bounding_box() else {
            continue;
        };

        positioned.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                return;
            }

            let alpha = coverage.clamp(0.0, 1.0);
            if alpha == 0.0 {
                return;
            }

            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                dst[channel] = (color[channel] as f32 * alpha + dst[channel] as f32 * (1.0 - alpha)) as u8;
            }
            dst[3] = 255;
        });
    }
}

/// Lossless PNG encoding of the canvas.
pub fn encode_png(canvas: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Rgb, TextColor};

    fn colors() -> ColorPair {
        ColorPair {
            primary: Rgb::new(255, 0, 40),
            secondary: Rgb::new(0, 255, 200),
        }
    }

    #[test]
    fn test_dimensions_match_canvas() {
        for size in [1, 17, 120] {
            let canvas = fill_background(size, &colors(), BackgroundMode::Gradient);
            assert_eq!(canvas.dimensions(), (size, size));
        }
    }

    #[test]
    fn test_gradient_endpoints() {
        let size = 1080;
        let canvas = fill_background(size, &colors(), BackgroundMode::Gradient);

        assert_eq!(*canvas.get_pixel(0, 0), Rgba([255, 0, 40, 255]));

        let corner = canvas.get_pixel(size - 1, size - 1);
        let target = [0u8, 255, 200];
        for channel in 0..3 {
            let diff = (corner[channel] as i16 - target[channel] as i16).abs();
            assert!(diff <= 1, "channel {} off by {}", channel, diff);
        }
        assert_eq!(corner[3], 255);
    }

    #[test]
    fn test_gradient_truncates_midpoint() {
        // (x + y) / (2 * size) = 0.5 at (2, 2) on a 4px canvas
        let canvas = fill_background(4, &colors(), BackgroundMode::Gradient);
        assert_eq!(*canvas.get_pixel(2, 2), Rgba([127, 127, 120, 255]));
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let canvas = fill_background(8, &colors(), BackgroundMode::Solid);
        assert!(canvas.pixels().all(|p| *p == Rgba([255, 0, 40, 255])));
    }

    #[test]
    fn test_draw_text_without_font_leaves_canvas() {
        let mut canvas = fill_background(16, &colors(), BackgroundMode::Solid);
        let before = canvas.clone();
        let glyph = GlyphSpec {
            text: "A".to_string(),
            fill: TextColor::White,
            font_size_px: 8,
        };
        draw_text(&mut canvas, &glyph, &FontCache::empty());
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_draw_text_is_centered() {
        let size = 120;
        let black = ColorPair {
            primary: Rgb::new(0, 0, 0),
            secondary: Rgb::new(0, 0, 0),
        };
        let mut canvas = fill_background(size, &black, BackgroundMode::Solid);
        let glyph = GlyphSpec {
            text: "AL".to_string(),
            fill: TextColor::White,
            font_size_px: 24,
        };
        draw_text(&mut canvas, &glyph, &FontCache::bundled());

        let inked: Vec<(u32, u32)> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(inked.len() > 50, "only {} text pixels", inked.len());

        let min_x = inked.iter().map(|p| p.0).min().unwrap() as f32;
        let max_x = inked.iter().map(|p| p.0).max().unwrap() as f32;
        let min_y = inked.iter().map(|p| p.1).min().unwrap() as f32;
        let max_y = inked.iter().map(|p| p.1).max().unwrap() as f32;

        let middle = (size - 1) as f32 / 2.0;
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        assert!((center_x - middle).abs() <= 2.0, "x center {}", center_x);
        assert!((center_y - middle).abs() <= 2.0, "y center {}", center_y);
        assert!(canvas.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_encode_png_round_trips_dimensions() {
        let canvas = fill_background(32, &colors(), BackgroundMode::Gradient);
        let bytes = encode_png(&canvas).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, canvas);
    }
}
