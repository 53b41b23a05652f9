//! Text rasterization
//!
//! A text component is drawn onto a transparent canvas as wide as the
//! measured string and one and a half font sizes tall, mirroring how a
//! browser canvas would lay it out.

use super::blend_pixel;
use crate::color::Rgb;
use crate::{Error, Result};
use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache};
use image::RgbaImage;

/// A rasterized string
#[derive(Debug, Clone)]
pub struct TextRaster {
    pub image: RgbaImage,
    /// Advance width of the laid-out string in pixels
    pub measured_width: f32,
}

/// Canvas height for a font size
pub fn canvas_height(font_size: f32) -> u32 {
    ((font_size * 1.5).ceil() as u32).max(1)
}

/// Turns strings into textures
pub trait TextRasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        font_size: f32,
        font_family: &str,
        color: Rgb,
    ) -> Result<TextRaster>;

    /// Make an extra font (TTF/OTF bytes) available; ignored by font-less rasterizers
    fn load_font(&mut self, _data: Vec<u8>) {}
}

/// Text rasterizer backed by cosmic-text shaping and swash glyph rendering
pub struct CosmicTextRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl CosmicTextRasterizer {
    /// Create a rasterizer using the system font database
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Register an additional font (TTF/OTF bytes)
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.font_system.db_mut().load_font_data(data);
    }
}

impl Default for CosmicTextRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn family_for(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "sans" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

impl TextRasterizer for CosmicTextRasterizer {
    fn load_font(&mut self, data: Vec<u8>) {
        self.load_font_data(data);
    }

    fn rasterize(
        &mut self,
        text: &str,
        font_size: f32,
        font_family: &str,
        color: Rgb,
    ) -> Result<TextRaster> {
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(Error::Text(format!("invalid font size {}", font_size)));
        }

        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(
            &mut self.font_system,
            text,
            &Attrs::new().family(family_for(font_family)),
            Shaping::Advanced,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        let measured_width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);

        let width = (measured_width.ceil() as u32).max(1);
        let mut image = RgbaImage::new(width, canvas_height(font_size));

        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            Color::rgb(color.r, color.g, color.b),
            |x, y, w, h, c| {
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        blend_pixel(&mut image, x + dx, y + dy, [c.r(), c.g(), c.b(), c.a()]);
                    }
                }
            },
        );

        tracing::debug!(
            "Rasterized {:?} at {}px {}: {}x{}",
            text,
            font_size,
            font_family,
            image.width(),
            image.height()
        );

        Ok(TextRaster {
            image,
            measured_width,
        })
    }
}

/// Font-independent rasterizer that draws one solid block per character
///
/// Every character advances by `advance` font sizes, so measurements are
/// exact and reproducible on machines without fonts (headless runs, tests).
#[derive(Debug, Clone, Copy)]
pub struct BlockRasterizer {
    pub advance: f32,
}

impl Default for BlockRasterizer {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextRasterizer for BlockRasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        font_size: f32,
        _font_family: &str,
        color: Rgb,
    ) -> Result<TextRaster> {
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(Error::Text(format!("invalid font size {}", font_size)));
        }

        let glyph = font_size * self.advance;
        let measured_width = glyph * text.chars().count() as f32;
        let mut image = RgbaImage::new(
            (measured_width.ceil() as u32).max(1),
            canvas_height(font_size),
        );

        let top = (font_size * 0.25) as i32;
        let bottom = font_size as i32;
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let left = (i as f32 * glyph + glyph * 0.1) as i32;
            let right = ((i + 1) as f32 * glyph - glyph * 0.1) as i32;
            for y in top..bottom {
                for x in left..right {
                    blend_pixel(&mut image, x, y, color.with_alpha(255));
                }
            }
        }

        Ok(TextRaster {
            image,
            measured_width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_measurement() {
        let mut raster = BlockRasterizer::default();
        let out = raster
            .rasterize("HELLO", 24.0, "Arial", Rgb::SILVER)
            .expect("rasterize");
        assert!((out.measured_width - 72.0).abs() < 1e-4);
        assert_eq!(out.image.width(), 72);
        assert_eq!(out.image.height(), 36);
    }

    #[test]
    fn test_block_draws_accent_pixels() {
        let mut raster = BlockRasterizer::default();
        let out = raster
            .rasterize("A", 20.0, "Arial", Rgb::SILVER)
            .expect("rasterize");
        let painted = out.image.pixels().filter(|p| p[3] == 255).count();
        assert!(painted > 0);
        assert!(
            out.image
                .pixels()
                .filter(|p| p[3] == 255)
                .all(|p| p[0] == 0xC0 && p[1] == 0xC0 && p[2] == 0xC0)
        );
    }

    #[test]
    fn test_invalid_font_size() {
        let mut raster = BlockRasterizer::default();
        assert!(raster.rasterize("A", 0.0, "Arial", Rgb::SILVER).is_err());
        assert!(raster.rasterize("A", f32::NAN, "Arial", Rgb::SILVER).is_err());
    }

    #[test]
    fn test_canvas_height() {
        assert_eq!(canvas_height(24.0), 36);
        assert_eq!(canvas_height(8.0), 12);
    }
}
