//! Textures for component quads
//!
//! Text is rasterized through a [`TextRasterizer`]; uploaded vector graphics
//! are recolored to the accent color and rendered at their intrinsic size.

pub mod text;
pub mod vector;

use image::{Pixel, Rgba, RgbaImage, imageops};

pub use text::{BlockRasterizer, CosmicTextRasterizer, TextRaster, TextRasterizer};
pub use vector::{DecodedGraphic, SvgRewrite, decode_svg, is_svg_upload, recolor_svg};

/// Source-over blend of a straight-alpha color into an image pixel
///
/// Coordinates outside the image are ignored.
pub fn blend_pixel(image: &mut RgbaImage, x: i32, y: i32, color: [u8; 4]) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if let Some(dst) = image.get_pixel_mut_checked(x, y) {
        dst.blend(&Rgba(color));
    }
}

/// Shrink an image so its longest edge is at most `max_edge`
///
/// Images already within the limit are returned unchanged.
pub fn fit_texture(image: &RgbaImage, max_edge: u32) -> RgbaImage {
    let longest = image.width().max(image.height());
    if longest <= max_edge || max_edge == 0 {
        return image.clone();
    }

    let ratio = max_edge as f32 / longest as f32;
    let width = ((image.width() as f32 * ratio).round() as u32).max(1);
    let height = ((image.height() as f32 * ratio).round() as u32).max(1);
    imageops::resize(image, width, height, imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_opaque_replaces() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        blend_pixel(&mut img, 1, 1, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_blend_onto_transparent() {
        let mut img = RgbaImage::new(1, 1);
        blend_pixel(&mut img, 0, 0, [200, 100, 50, 128]);
        let p = img.get_pixel(0, 0);
        for (got, want) in p.0.iter().zip([200u8, 100, 50, 128]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", p);
        }
    }

    #[test]
    fn test_blend_half_over_opaque() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        blend_pixel(&mut img, 0, 0, [255, 255, 255, 128]);
        let p = img.get_pixel(0, 0);
        assert!(p[3] >= 254, "{:?}", p);
        assert!((126..=129).contains(&p[0]), "{:?}", p);
    }

    #[test]
    fn test_blend_ignores_out_of_bounds() {
        let mut img = RgbaImage::new(1, 1);
        blend_pixel(&mut img, -1, 0, [255, 255, 255, 255]);
        blend_pixel(&mut img, 0, 5, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_fit_texture() {
        let img = RgbaImage::new(8000, 2000);
        let fitted = fit_texture(&img, 4096);
        assert_eq!(fitted.width(), 4096);
        assert_eq!(fitted.height(), 1024);

        let small = RgbaImage::new(10, 10);
        assert_eq!(fit_texture(&small, 4096).dimensions(), (10, 10));
    }
}
