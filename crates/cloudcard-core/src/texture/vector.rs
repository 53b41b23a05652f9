//! Imported vector graphics
//!
//! Uploaded SVG documents are normalized to the accent color before they
//! are rendered or embedded: every `fill` and `stroke` other than `none`,
//! both as attributes and inside `style` declarations, is rewritten, and the
//! root element gets a `color` so `currentColor` resolves to the accent too.

use crate::color::Rgb;
use crate::{Error, Result};
use image::RgbaImage;
use resvg::{tiny_skia, usvg};
use svg::node::element::tag::Type;
use svg::parser::Event;

/// Uploads accepted by the editor
pub const SVG_MIME: &str = "image/svg+xml";

/// Whether an uploaded file is an SVG document, judged by MIME type or extension
pub fn is_svg_upload(file_name: &str, mime: Option<&str>) -> bool {
    if let Some(mime) = mime.filter(|m| !m.is_empty()) {
        return mime.eq_ignore_ascii_case(SVG_MIME);
    }
    file_name.to_ascii_lowercase().ends_with(".svg")
}

/// Options for [`SvgRewrite::apply`]
#[derive(Debug, Clone, Copy)]
pub struct SvgRewrite {
    pub accent: Rgb,
    /// Replace the root `width`/`height` (used when nesting into another document)
    pub root_size: Option<(f32, f32)>,
}

impl SvgRewrite {
    pub fn new(accent: Rgb) -> Self {
        Self {
            accent,
            root_size: None,
        }
    }

    pub fn with_root_size(mut self, width: f32, height: f32) -> Self {
        self.root_size = Some((width, height));
        self
    }

    /// Rewrite a document, dropping the XML prolog, comments and processing instructions
    ///
    /// CDATA sections are copied unchanged.
    pub fn apply(&self, source: &str) -> Result<String> {
        let accent = self.accent.to_string();
        let parser = svg::read(source).map_err(|e| Error::MalformedVector(e.to_string()))?;

        let mut out = String::with_capacity(source.len());
        let mut depth = 0usize;
        let mut seen_root = false;

        for event in parser {
            match event {
                Event::Tag(name, kind, attributes) => {
                    if kind == Type::End {
                        depth = depth.saturating_sub(1);
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                        continue;
                    }

                    let is_root = depth == 0 && !seen_root && name == "svg";
                    seen_root |= is_root;

                    let mut attrs: Vec<(String, String)> = attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_string()))
                        .collect();
                    attrs.sort_by(|a, b| a.0.cmp(&b.0));

                    for (key, value) in &mut attrs {
                        match key.as_str() {
                            "fill" | "stroke" if !is_none(value) => value.clone_from(&accent),
                            "style" => *value = recolor_style(value, &accent),
                            _ => {}
                        }
                    }

                    if is_root {
                        set_attr(&mut attrs, "color", accent.clone());
                        if let Some((w, h)) = self.root_size {
                            set_attr(&mut attrs, "width", w.to_string());
                            set_attr(&mut attrs, "height", h.to_string());
                        }
                    }

                    out.push('<');
                    out.push_str(name);
                    for (key, value) in &attrs {
                        out.push(' ');
                        out.push_str(key);
                        out.push_str("=\"");
                        out.push_str(&value.replace('"', "&quot;"));
                        out.push('"');
                    }
                    if kind == Type::Empty {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        depth += 1;
                    }
                }
                Event::Text(text) => out.push_str(text),
                Event::Declaration(cdata) if cdata.starts_with("<![CDATA[") => out.push_str(cdata),
                Event::Error(e) => return Err(Error::MalformedVector(e.to_string())),
                Event::Declaration(_) | Event::Comment(_) | Event::Instruction(_) => {}
            }
        }

        if !seen_root {
            return Err(Error::MalformedVector("no <svg> root element".to_string()));
        }
        Ok(out)
    }
}

fn is_none(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("none")
}

fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value,
        None => attrs.push((key.to_string(), value)),
    }
}

/// Rewrite `fill`/`stroke` declarations inside a `style` attribute
fn recolor_style(style: &str, accent: &str) -> String {
    style
        .split(';')
        .filter(|decl| !decl.trim().is_empty())
        .map(|decl| match decl.split_once(':') {
            Some((prop, value))
                if matches!(prop.trim(), "fill" | "stroke") && !is_none(value) =>
            {
                format!("{}:{}", prop.trim(), accent)
            }
            _ => decl.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Recolor a document to the accent color
pub fn recolor_svg(source: &str, accent: Rgb) -> Result<String> {
    SvgRewrite::new(accent).apply(source)
}

/// A rasterized vector graphic
///
/// `width` and `height` are the intrinsic size of the document; the texture
/// may be smaller when that size exceeds the raster limit.
#[derive(Debug, Clone)]
pub struct DecodedGraphic {
    pub width: u32,
    pub height: u32,
    pub texture: RgbaImage,
}

/// Recolor and rasterize an uploaded SVG
///
/// The raster keeps the document's aspect ratio with its longest edge at
/// most `max_edge` pixels.
pub fn decode_svg(source: &str, accent: Rgb, max_edge: u32) -> Result<DecodedGraphic> {
    let recolored = recolor_svg(source, accent)?;

    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(&recolored, &options)
        .map_err(|e| Error::MalformedVector(e.to_string()))?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());

    let longest = width.max(height);
    let ratio = if max_edge > 0 && longest > max_edge {
        max_edge as f32 / longest as f32
    } else {
        1.0
    };
    let raster_width = ((width as f32 * ratio).round() as u32).max(1);
    let raster_height = ((height as f32 * ratio).round() as u32).max(1);

    let mut pixmap = tiny_skia::Pixmap::new(raster_width, raster_height).ok_or_else(|| {
        Error::MalformedVector(format!(
            "cannot allocate {}x{} canvas",
            raster_width, raster_height
        ))
    })?;
    let transform = tiny_skia::Transform::from_scale(
        raster_width as f32 / width as f32,
        raster_height as f32 / height as f32,
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut data = Vec::with_capacity((raster_width * raster_height * 4) as usize);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let texture = RgbaImage::from_raw(raster_width, raster_height, data)
        .ok_or_else(|| Error::MalformedVector("pixel buffer size mismatch".to_string()))?;

    if ratio < 1.0 {
        tracing::debug!(
            "Decoded vector graphic {}x{} into a {}x{} raster",
            width,
            height,
            raster_width,
            raster_height
        );
    } else {
        tracing::debug!("Decoded vector graphic {}x{}", width, height);
    }

    Ok(DecodedGraphic {
        width,
        height,
        texture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGO: &str = r##"<?xml version="1.0"?>
<!-- logo -->
<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20">
  <rect x="0" y="0" width="20" height="20" fill="#ff0000" stroke="none"/>
  <circle cx="30" cy="10" r="8" style="fill: blue; stroke-width: 2"/>
  <path d="M0 0 L40 20" stroke="black" fill="none"/>
</svg>"##;

    #[test]
    fn test_svg_upload_detection() {
        assert!(is_svg_upload("logo.svg", None));
        assert!(is_svg_upload("LOGO.SVG", Some("")));
        assert!(is_svg_upload("logo", Some("image/svg+xml")));
        assert!(!is_svg_upload("photo.png", Some("image/png")));
        assert!(!is_svg_upload("logo.svg", Some("image/png")));
    }

    #[test]
    fn test_recolor_rewrites_fill_and_stroke() {
        let out = recolor_svg(LOGO, Rgb::SILVER).expect("recolor");
        assert!(out.contains(r##"fill="#c0c0c0""##));
        assert!(out.contains(r##"stroke="#c0c0c0""##));
        assert!(!out.contains("#ff0000"));
        assert!(!out.contains("black"));
        assert!(out.contains("fill:#c0c0c0"));
        assert!(out.contains("stroke-width: 2") || out.contains("stroke-width:2"));
    }

    #[test]
    fn test_recolor_keeps_none() {
        let out = recolor_svg(LOGO, Rgb::SILVER).expect("recolor");
        assert!(out.contains(r#"stroke="none""#));
        assert!(out.contains(r#"fill="none""#));
    }

    #[test]
    fn test_recolor_drops_prolog_and_sets_color() {
        let out = recolor_svg(LOGO, Rgb::SILVER).expect("recolor");
        assert!(out.starts_with("<svg"));
        assert!(!out.contains("<?xml"));
        assert!(!out.contains("logo -->"));
        assert!(out.contains(r##"color="#c0c0c0""##));
    }

    #[test]
    fn test_root_size_override() {
        let out = SvgRewrite::new(Rgb::SILVER)
            .with_root_size(40.0, 20.0)
            .apply(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20"/>"#)
            .expect("rewrite");
        assert!(out.contains(r#"width="40""#));
        assert!(out.contains(r#"height="20""#));
    }

    #[test]
    fn test_not_svg_is_malformed() {
        assert!(matches!(
            recolor_svg("<html><body/></html>", Rgb::SILVER),
            Err(Error::MalformedVector(_))
        ));
        assert!(decode_svg("definitely not xml", Rgb::SILVER, 4096).is_err());
    }

    #[test]
    fn test_decode_intrinsic_size_and_color() {
        let decoded = decode_svg(LOGO, Rgb::SILVER, 4096).expect("decode");
        assert_eq!((decoded.width, decoded.height), (40, 20));
        assert_eq!(decoded.texture.dimensions(), (40, 20));

        let px = decoded.texture.get_pixel(10, 10);
        assert_eq!(px[3], 255);
        assert!((i32::from(px[0]) - 0xC0).abs() <= 1);
        assert!((i32::from(px[1]) - 0xC0).abs() <= 1);
    }

    #[test]
    fn test_decode_caps_raster_size() {
        let huge = r##"<svg xmlns="http://www.w3.org/2000/svg" width="60000" height="30000"><rect width="60000" height="30000" fill="#000"/></svg>"##;
        let decoded = decode_svg(huge, Rgb::SILVER, 512).expect("decode");

        // Intrinsic size drives the fit; only the raster shrinks
        assert_eq!((decoded.width, decoded.height), (60000, 30000));
        assert_eq!(decoded.texture.dimensions(), (512, 256));
        assert_eq!(decoded.texture.get_pixel(256, 128)[3], 255);
    }

    #[test]
    fn test_cdata_passes_through() {
        let styled = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><style><![CDATA[ rect { opacity: 0.5 } ]]></style><rect width="10" height="10"/></svg>"#;
        let out = recolor_svg(styled, Rgb::SILVER).expect("recolor");
        assert!(out.contains("<style><![CDATA[ rect { opacity: 0.5 } ]]></style>"), "{}", out);

        let decoded = decode_svg(styled, Rgb::SILVER, 4096).expect("decode");
        let alpha = decoded.texture.get_pixel(5, 5)[3];
        assert!((120..=135).contains(&alpha), "alpha {}", alpha);
    }
}
