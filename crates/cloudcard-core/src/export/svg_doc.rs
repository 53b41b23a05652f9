//! Vector drawing export
//!
//! The document is laid out in millimeters with the origin at the top-left
//! corner of the card, so it prints at true size.

use crate::card::{Card, UNITS_PER_MM};
use crate::color::Rgb;
use crate::component::{Component, ComponentId, ComponentKind, GraphicData, TextData};
use crate::geometry::Segment;
use crate::registry::ComponentRegistry;
use crate::texture::SvgRewrite;
use crate::Result;
use glam::Vec2;
use svg::Document;
use svg::node::Blob;
use svg::node::element::path::Data;
use svg::node::element::{Group, Path, Text};

/// Convert a card-plane position (scene units, y up, centered) to document millimeters
pub fn scene_to_document_mm(position: Vec2, card_mm: Vec2) -> Vec2 {
    Vec2::new(
        position.x / UNITS_PER_MM + card_mm.x / 2.0,
        -position.y / UNITS_PER_MM + card_mm.y / 2.0,
    )
}

/// Build the SVG drawing of the card and its visible components
///
/// Returns the document text and the ids of components that were skipped
/// because their content could not be processed.
pub fn build_svg_document(
    card: &Card,
    registry: &ComponentRegistry,
    accent: Rgb,
) -> (String, Vec<ComponentId>) {
    let shape = card.document_shape();
    let size_mm = Vec2::new(shape.width, shape.height);

    let mut data = Data::new().move_to((shape.start().x, shape.start().y));
    for segment in shape.segments() {
        data = match segment {
            Segment::Line { to } => data.line_to((to.x, to.y)),
            Segment::Quad { ctrl, to } => data.quadratic_curve_to((ctrl.x, ctrl.y, to.x, to.y)),
        };
    }
    let outline = Path::new()
        .set("d", data.close())
        .set("fill", card.color.rgb().to_string());

    let mut document = Document::new()
        .set("width", format!("{}mm", size_mm.x))
        .set("height", format!("{}mm", size_mm.y))
        .set("viewBox", (0.0, 0.0, size_mm.x, size_mm.y))
        .add(outline);

    let mut skipped = Vec::new();
    for component in registry.all().filter(|c| c.quad.visible) {
        let at = scene_to_document_mm(component.position, size_mm);
        match &component.kind {
            ComponentKind::Text(text) => {
                document = document.add(text_element(text, component.scale, at, accent));
            }
            ComponentKind::VectorGraphic(graphic) => {
                match graphic_group(component, graphic, at, accent) {
                    Ok(group) => document = document.add(group),
                    Err(e) => {
                        tracing::warn!("Skipping {} in SVG export: {}", component.id, e);
                        skipped.push(component.id);
                    }
                }
            }
        }
    }

    (document.to_string(), skipped)
}

fn text_element(text: &TextData, scale: f32, at: Vec2, accent: Rgb) -> Text {
    // The quad is font_size / 100 scene units tall, i.e. font_size / 10 mm
    let font_size_mm = text.font_size as f32 * scale / 10.0;

    Text::new(text.content.clone())
        .set("x", at.x)
        .set("y", at.y)
        .set("font-family", text.font_family.clone())
        .set("font-size", font_size_mm)
        .set("fill", accent.to_string())
        .set("text-anchor", "middle")
        .set("dominant-baseline", "middle")
}

fn graphic_group(
    component: &Component,
    graphic: &GraphicData,
    at: Vec2,
    accent: Rgb,
) -> Result<Group> {
    let (w, h) = (
        graphic.original_width as f32,
        graphic.original_height as f32,
    );
    let nested = SvgRewrite::new(accent)
        .with_root_size(w, h)
        .apply(&graphic.source)?;

    // Source pixels -> millimeters, centered on the component position
    let mm_per_px = graphic.fit_scale * component.scale / UNITS_PER_MM;
    let transform = format!(
        "translate({} {}) scale({}) translate({} {})",
        at.x,
        at.y,
        mm_per_px,
        -w / 2.0,
        -h / 2.0
    );

    Ok(Group::new()
        .set("transform", transform)
        .add(Blob::new(nested)))
}
