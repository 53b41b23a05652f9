//! Component registry
//!
//! Owns every placed component, keyed by id. Ids come from a single
//! counter that only ever grows, so iteration order (ascending id) is the
//! order in which components were added, and a removed id is never handed
//! out again.
//!
//! Uploads are two-phase: [`ComponentRegistry::request_upload`] reserves an
//! id while the file is being read, and
//! [`ComponentRegistry::complete_upload`] either applies it or reports that
//! the reservation was cancelled in the meantime.

use crate::card::CardDimensions;
use crate::color::Rgb;
use crate::component::{
    Component, ComponentId, ComponentKind, ComponentKindTag, GraphicData, RenderQuad, TextData,
};
use crate::config::{EditorConfig, GraphicConfig, InteractionConfig, TextConfig};
use crate::texture::{TextRasterizer, decode_svg, is_svg_upload};
use crate::{Error, Result};
use glam::Vec2;
use serde::Serialize;
use std::collections::BTreeMap;

/// Partial edit of a text component; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct TextChanges {
    pub content: Option<String>,
    pub font_size: Option<u32>,
    pub font_family: Option<String>,
}

/// Reservation for an upload in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    id: ComponentId,
}

impl UploadTicket {
    /// The id the component will get once applied
    pub fn id(&self) -> ComponentId {
        self.id
    }
}

/// How a completed upload ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Applied(ComponentId),
    /// The reservation was removed before the content arrived
    Cancelled,
}

/// Listing entry for the components panel
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub id: ComponentId,
    pub name: String,
    pub kind: ComponentKindTag,
    pub selected: bool,
    pub visible: bool,
    pub position: [f32; 2],
    pub scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_percent: Option<u32>,
}

/// All components of a session plus the selection
pub struct ComponentRegistry {
    components: BTreeMap<ComponentId, Component>,
    pending: BTreeMap<ComponentId, String>,
    next_id: u32,
    selected: Option<ComponentId>,
    card: CardDimensions,
    accent: Rgb,
    max_texture_size: u32,
    text: TextConfig,
    graphic: GraphicConfig,
    interaction: InteractionConfig,
    rasterizer: Box<dyn TextRasterizer>,
}

impl ComponentRegistry {
    pub fn new(
        config: &EditorConfig,
        card: CardDimensions,
        rasterizer: Box<dyn TextRasterizer>,
    ) -> Self {
        Self {
            components: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_id: 0,
            selected: None,
            card,
            accent: config.export.accent_color,
            max_texture_size: config.export.max_texture_size,
            text: config.text.clone(),
            graphic: config.graphic.clone(),
            interaction: config.interaction.clone(),
            rasterizer,
        }
    }

    fn allocate_id(&mut self) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn card(&self) -> &CardDimensions {
        &self.card
    }

    pub fn accent(&self) -> Rgb {
        self.accent
    }

    /// Make an extra font available to text components
    pub fn load_font(&mut self, data: Vec<u8>) {
        self.rasterizer.load_font(data);
    }

    // ========================================================================
    // Adding and editing
    // ========================================================================

    /// Add a text component at the card center
    pub fn add_text(&mut self, content: &str, font_size: u32, font_family: &str) -> Result<ComponentId> {
        let data = self.text_data(content, font_size, font_family)?;
        let quad = self.text_quad(&data)?;

        let id = self.allocate_id();
        let component = Component::new(id, data.content.clone(), ComponentKind::Text(data), quad);
        tracing::info!("Added text component {} {:?}", id, component.name);
        self.components.insert(id, component);
        Ok(id)
    }

    /// Add an SVG document as a vector-graphic component at the card center
    pub fn add_vector_graphic(&mut self, name: &str, bytes: &[u8], size_percent: u32) -> Result<ComponentId> {
        let (kind, quad) = self.graphic(bytes, size_percent)?;
        let id = self.allocate_id();
        self.insert_graphic(id, name, kind, quad);
        Ok(id)
    }

    /// Insert a graphic as-is, bypassing decoding, so exporters can be fed
    /// content they cannot process
    #[cfg(test)]
    pub(crate) fn insert_raw_graphic(&mut self, name: &str, source: &str, texture: image::RgbaImage) -> ComponentId {
        let (width, height) = texture.dimensions();
        let kind = ComponentKind::VectorGraphic(GraphicData {
            source: source.to_string(),
            original_width: width,
            original_height: height,
            size_percent: 100,
            fit_scale: 0.01,
        });
        let quad = RenderQuad::new(width as f32 * 0.01, height as f32 * 0.01, texture);
        let id = self.allocate_id();
        self.insert_graphic(id, name, kind, quad);
        id
    }

    fn insert_graphic(&mut self, id: ComponentId, name: &str, kind: ComponentKind, quad: RenderQuad) {
        tracing::info!(
            "Added vector graphic {} {:?} ({:.3}x{:.3})",
            id,
            name,
            quad.width,
            quad.height
        );
        self.components
            .insert(id, Component::new(id, name, kind, quad));
    }

    /// Change the content, size or family of a text component
    ///
    /// The texture is regenerated and the position re-clamped to the new
    /// size. The scale is kept unless the scaled text would no longer fit on
    /// the card, in which case it is lowered until it does; an edit that
    /// does not fit even at the minimum scale is rejected.
    pub fn update_text(&mut self, id: ComponentId, changes: TextChanges) -> Result<()> {
        let current = self.expect_kind(id, ComponentKindTag::Text)?;
        let Some(current) = current.as_text() else {
            return Err(Error::NotFound(id));
        };

        let content = changes.content.unwrap_or_else(|| current.content.clone());
        let font_size = changes.font_size.unwrap_or(current.font_size);
        let font_family = changes
            .font_family
            .unwrap_or_else(|| current.font_family.clone());

        let current_scale = self.get(id).ok_or(Error::NotFound(id))?.scale;
        let data = self.text_data(&content, font_size, &font_family)?;
        let mut quad = self.text_quad(&data)?;
        let scale = self.refit_scale(id, current_scale, quad.size())?;

        let card = self.card;
        let component = self.components.get_mut(&id).ok_or(Error::NotFound(id))?;
        quad.visible = component.quad.visible;
        component.name.clone_from(&data.content);
        component.kind = ComponentKind::Text(data);
        component.quad = quad;
        component.scale = scale;
        component.position = card.clamp_center(component.position, component.scaled_size());

        tracing::debug!("Updated text component {}", id);
        Ok(())
    }

    /// Change the size percentage of a vector graphic
    ///
    /// Scale and position follow the same rules as [`Self::update_text`].
    pub fn update_graphic_size(&mut self, id: ComponentId, size_percent: u32) -> Result<()> {
        self.check_percent(size_percent)?;
        let component = self.expect_kind(id, ComponentKindTag::VectorGraphic)?;
        let Some(graphic) = component.as_graphic() else {
            return Err(Error::NotFound(id));
        };

        let fit_scale = GraphicData::fit_scale_for(
            self.card.extents(),
            graphic.original_width,
            graphic.original_height,
            size_percent,
            self.interaction.fit_factor,
        );
        let size = Vec2::new(graphic.original_width as f32, graphic.original_height as f32) * fit_scale;
        let scale = self.refit_scale(id, component.scale, size)?;

        let card = self.card;
        let component = self.components.get_mut(&id).ok_or(Error::NotFound(id))?;
        if let ComponentKind::VectorGraphic(graphic) = &mut component.kind {
            graphic.size_percent = size_percent;
            graphic.fit_scale = fit_scale;
        }
        component.quad.resize(size.x, size.y);
        component.scale = scale;
        component.position = card.clamp_center(component.position, component.scaled_size());

        tracing::debug!("Resized vector graphic {} to {}%", id, size_percent);
        Ok(())
    }

    /// Remove a component, or cancel an upload still in flight
    pub fn remove(&mut self, id: ComponentId) -> Result<()> {
        if let Some(name) = self.pending.remove(&id) {
            tracing::info!("Cancelled pending upload {} {:?}", id, name);
            return Ok(());
        }

        let component = self.components.remove(&id).ok_or(Error::NotFound(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::info!("Removed {} component {} {:?}", component.tag(), id, component.name);
        Ok(())
    }

    // ========================================================================
    // Two-phase upload
    // ========================================================================

    /// Reserve an id for a file that is about to be read
    ///
    /// Only SVG documents are accepted.
    pub fn request_upload(&mut self, file_name: &str, mime: Option<&str>) -> Result<UploadTicket> {
        if !is_svg_upload(file_name, mime) {
            return Err(Error::InvalidInput(format!(
                "{} is not an SVG file",
                file_name
            )));
        }

        let id = self.allocate_id();
        self.pending.insert(id, file_name.to_string());
        tracing::debug!("Reserved {} for upload {:?}", id, file_name);
        Ok(UploadTicket { id })
    }

    /// Apply the content of a reserved upload
    ///
    /// Completing a ticket that was cancelled (or already completed) is a
    /// no-op reported as [`UploadOutcome::Cancelled`]. A content error
    /// consumes the reservation.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        bytes: &[u8],
        size_percent: u32,
    ) -> Result<UploadOutcome> {
        let Some(name) = self.pending.remove(&ticket.id) else {
            tracing::debug!("Upload {} was cancelled", ticket.id);
            return Ok(UploadOutcome::Cancelled);
        };

        let (kind, quad) = self.graphic(bytes, size_percent)?;
        self.insert_graphic(ticket.id, &name, kind, quad);
        Ok(UploadOutcome::Applied(ticket.id))
    }

    /// Whether an id is reserved by an upload in flight
    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.pending.contains_key(&id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Components in insertion order
    pub fn all(&self) -> impl DoubleEndedIterator<Item = &Component> {
        self.components.values()
    }

    pub fn ids(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Listing for the components panel
    pub fn summaries(&self) -> Vec<ComponentSummary> {
        self.all()
            .map(|c| {
                let (font_size, font_family, size_percent) = match &c.kind {
                    ComponentKind::Text(t) => (Some(t.font_size), Some(t.font_family.clone()), None),
                    ComponentKind::VectorGraphic(g) => (None, None, Some(g.size_percent)),
                };
                ComponentSummary {
                    id: c.id,
                    name: c.name.clone(),
                    kind: c.tag(),
                    selected: self.selected == Some(c.id),
                    visible: c.quad.visible,
                    position: c.position.to_array(),
                    scale: c.scale,
                    font_size,
                    font_family,
                    size_percent,
                }
            })
            .collect()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, id: ComponentId) -> Result<()> {
        if !self.components.contains_key(&id) {
            return Err(Error::NotFound(id));
        }
        if self.selected != Some(id) {
            tracing::debug!("Selected {}", id);
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn selected(&self) -> Option<ComponentId> {
        self.selected
    }

    pub fn selected_component(&self) -> Option<&Component> {
        self.selected.and_then(|id| self.components.get(&id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Move a component, clamping its scaled box to the card; returns the applied position
    pub fn place(&mut self, id: ComponentId, position: Vec2) -> Result<Vec2> {
        let card = self.card;
        let component = self.components.get_mut(&id).ok_or(Error::NotFound(id))?;
        component.position = card.clamp_center(position, component.scaled_size());
        Ok(component.position)
    }

    /// Move a component by an offset, clamped like [`Self::place`]
    pub fn translate(&mut self, id: ComponentId, offset: Vec2) -> Result<Vec2> {
        let current = self.get(id).ok_or(Error::NotFound(id))?.position;
        self.place(id, current + offset)
    }

    /// Set the uniform scale, clamped to the allowed range
    ///
    /// Returns `false` and leaves the component unchanged when the scaled
    /// quad would not fit on the card.
    pub fn rescale(&mut self, id: ComponentId, scale: f32) -> Result<bool> {
        let card = self.card;
        let scale = scale.clamp(self.interaction.min_scale, self.interaction.max_scale);
        let component = self.components.get_mut(&id).ok_or(Error::NotFound(id))?;

        if !card.fits(component.quad.size() * scale) {
            tracing::debug!("Rejected scale {:.2} for {}: larger than the card", scale, id);
            return Ok(false);
        }
        component.scale = scale;
        component.position = card.clamp_center(component.position, component.scaled_size());
        Ok(true)
    }

    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        let component = self.components.get_mut(&id).ok_or(Error::NotFound(id))?;
        component.quad.visible = visible;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn expect_kind(&self, id: ComponentId, expected: ComponentKindTag) -> Result<&Component> {
        let component = self.get(id).ok_or(Error::NotFound(id))?;
        let actual = component.tag();
        if actual != expected {
            return Err(Error::TypeMismatch {
                id,
                expected,
                actual,
            });
        }
        Ok(component)
    }

    fn text_data(&self, content: &str, font_size: u32, font_family: &str) -> Result<TextData> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("text is empty".to_string()));
        }
        if !(self.text.min_font_size..=self.text.max_font_size).contains(&font_size) {
            return Err(Error::InvalidInput(format!(
                "font size {} outside {}-{}",
                font_size, self.text.min_font_size, self.text.max_font_size
            )));
        }

        let font_family = if font_family.trim().is_empty() {
            self.text.default_font_family.clone()
        } else {
            font_family.to_string()
        };

        Ok(TextData {
            content: content.to_string(),
            font_family,
            font_size,
        })
    }

    fn text_quad(&mut self, data: &TextData) -> Result<RenderQuad> {
        let raster = self.rasterizer.rasterize(
            &data.content,
            data.font_size as f32,
            &data.font_family,
            self.accent,
        )?;
        Ok(RenderQuad::new(
            raster.measured_width / 100.0,
            data.font_size as f32 / 100.0,
            raster.image,
        ))
    }

    /// Scale to keep after a component changes size
    ///
    /// The current scale if the new size still fits at it, otherwise the
    /// largest scale that fits, as long as that is not below the minimum.
    fn refit_scale(&self, id: ComponentId, current: f32, size: Vec2) -> Result<f32> {
        if self.card.fits(size * current) {
            return Ok(current);
        }
        let fitted = self.card.max_fitting_scale(size);
        if fitted < self.interaction.min_scale {
            return Err(Error::InvalidInput(format!(
                "{} would not fit on the card even at scale {}",
                id, self.interaction.min_scale
            )));
        }
        tracing::debug!(
            "Lowered scale of {} from {:.2} to {:.2} to stay on the card",
            id,
            current,
            fitted
        );
        Ok(fitted)
    }

    fn check_percent(&self, size_percent: u32) -> Result<()> {
        if (self.graphic.min_size_percent..=self.graphic.max_size_percent).contains(&size_percent) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "size {}% outside {}-{}%",
                size_percent, self.graphic.min_size_percent, self.graphic.max_size_percent
            )))
        }
    }

    fn graphic(&self, bytes: &[u8], size_percent: u32) -> Result<(ComponentKind, RenderQuad)> {
        self.check_percent(size_percent)?;
        let source = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedVector(format!("not UTF-8 text: {}", e)))?;
        let decoded = decode_svg(source, self.accent, self.max_texture_size)?;

        let fit_scale = GraphicData::fit_scale_for(
            self.card.extents(),
            decoded.width,
            decoded.height,
            size_percent,
            self.interaction.fit_factor,
        );
        let quad = RenderQuad::new(
            decoded.width as f32 * fit_scale,
            decoded.height as f32 * fit_scale,
            decoded.texture,
        );
        let kind = ComponentKind::VectorGraphic(GraphicData {
            source: source.to_string(),
            original_width: decoded.width,
            original_height: decoded.height,
            size_percent,
            fit_scale,
        });
        Ok((kind, quad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::texture::BlockRasterizer;
    use approx::assert_relative_eq;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><rect width="100" height="100" fill="#123456"/></svg>"##;

    fn registry() -> ComponentRegistry {
        let config = EditorConfig::default();
        let card = Card::new(&config.card);
        ComponentRegistry::new(&config, *card.dimensions(), Box::new(BlockRasterizer::default()))
    }

    #[test]
    fn test_add_text_sizes_quad() {
        let mut reg = registry();
        let id = reg.add_text("HELLO", 24, "Arial").expect("add");
        let c = reg.get(id).expect("component");

        // 5 chars * 0.6 * 24px = 72px
        assert_relative_eq!(c.quad.width, 0.72, epsilon = 1e-5);
        assert_relative_eq!(c.quad.height, 0.24, epsilon = 1e-5);
        assert_eq!(c.quad.texture.height(), 36);
        assert_eq!(c.name, "HELLO");
        assert_eq!(reg.selected(), None);
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let mut reg = registry();
        let a = reg.add_text("A", 24, "Arial").expect("add");
        let b = reg.add_text("B", 24, "Arial").expect("add");
        reg.remove(b).expect("remove");
        let c = reg.add_text("C", 24, "Arial").expect("add");
        assert!(a < b && b < c);
        assert_eq!(reg.ids(), vec![a, c]);
    }

    #[test]
    fn test_invalid_text_input() {
        let mut reg = registry();
        assert!(matches!(reg.add_text("   ", 24, "Arial"), Err(Error::InvalidInput(_))));
        assert!(matches!(reg.add_text("x", 7, "Arial"), Err(Error::InvalidInput(_))));
        assert!(matches!(reg.add_text("x", 73, "Arial"), Err(Error::InvalidInput(_))));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_empty_family_uses_default() {
        let mut reg = registry();
        let id = reg.add_text("x", 24, "").expect("add");
        let text = reg.get(id).and_then(Component::as_text).expect("text");
        assert_eq!(text.font_family, "Arial");
    }

    #[test]
    fn test_add_vector_graphic_fits_card() {
        let mut reg = registry();
        let id = reg
            .add_vector_graphic("square.svg", SQUARE.as_bytes(), 100)
            .expect("add");
        let c = reg.get(id).expect("component");
        // Height-bound: 5.398 * 0.8
        assert_relative_eq!(c.quad.height, 5.398 * 0.8, epsilon = 1e-4);
        assert_relative_eq!(c.quad.width, c.quad.height, epsilon = 1e-5);
        assert_eq!(c.quad.texture.dimensions(), (100, 100));
    }

    #[test]
    fn test_malformed_upload() {
        let mut reg = registry();
        let err = reg.add_vector_graphic("bad.svg", b"<svg", 100);
        assert!(matches!(err, Err(Error::MalformedVector(_))));
        let err = reg.add_vector_graphic("bad.svg", &[0xff, 0xfe], 100);
        assert!(matches!(err, Err(Error::MalformedVector(_))));
    }

    #[test]
    fn test_update_wrong_kind_and_unknown() {
        let mut reg = registry();
        let text = reg.add_text("A", 24, "Arial").expect("add");
        let graphic = reg
            .add_vector_graphic("square.svg", SQUARE.as_bytes(), 100)
            .expect("add");

        assert!(matches!(
            reg.update_graphic_size(text, 50),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            reg.update_text(graphic, TextChanges::default()),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            reg.update_text(ComponentId(99), TextChanges::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_text_regenerates() {
        let mut reg = registry();
        let id = reg.add_text("AB", 24, "Arial").expect("add");
        reg.update_text(
            id,
            TextChanges {
                content: Some("ABCD".into()),
                font_size: Some(48),
                ..Default::default()
            },
        )
        .expect("update");

        let c = reg.get(id).expect("component");
        assert_eq!(c.name, "ABCD");
        assert_relative_eq!(c.quad.width, 4.0 * 0.6 * 48.0 / 100.0, epsilon = 1e-5);
        assert_relative_eq!(c.quad.height, 0.48, epsilon = 1e-5);
    }

    #[test]
    fn test_update_graphic_size() {
        let mut reg = registry();
        let id = reg
            .add_vector_graphic("square.svg", SQUARE.as_bytes(), 100)
            .expect("add");
        let before = reg.get(id).expect("c").quad.width;
        reg.update_graphic_size(id, 50).expect("resize");
        let after = reg.get(id).expect("c").quad.width;
        assert_relative_eq!(after, before * 0.5, epsilon = 1e-5);
        assert!(matches!(reg.update_graphic_size(id, 5), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_update_graphic_size_lowers_scale_to_fit() {
        let mut reg = registry();
        let id = reg
            .add_vector_graphic("square.svg", SQUARE.as_bytes(), 10)
            .expect("add");
        assert!(reg.rescale(id, 5.0).expect("rescale"));

        // At 100% and scale 5 the square would be 21.59 units wide
        reg.update_graphic_size(id, 100).expect("resize");
        let c = reg.get(id).expect("c");
        assert_relative_eq!(c.scale, 1.25, epsilon = 1e-4);
        let card = reg.card();
        assert!(c.scaled_size().x <= card.width + 1e-4);
        assert!(c.scaled_size().y <= card.height + 1e-4);
        assert_eq!(c.as_graphic().expect("graphic").size_percent, 100);
    }

    #[test]
    fn test_update_text_lowers_scale_to_fit() {
        let mut reg = registry();
        let id = reg.add_text("HI", 24, "Arial").expect("add");
        assert!(reg.rescale(id, 5.0).expect("rescale"));

        reg.update_text(
            id,
            TextChanges {
                content: Some("HELLO WORLD".into()),
                font_size: Some(72),
                ..Default::default()
            },
        )
        .expect("update");

        let c = reg.get(id).expect("c");
        // 11 chars * 0.6 * 72px = 4.752 units wide
        assert_relative_eq!(c.scale, 8.56 / 4.752, epsilon = 1e-4);
        assert!(c.scaled_size().x <= reg.card().width + 1e-4);
    }

    #[test]
    fn test_update_text_keeps_scale_that_fits() {
        let mut reg = registry();
        let id = reg.add_text("HI", 24, "Arial").expect("add");
        assert!(reg.rescale(id, 2.0).expect("rescale"));
        reg.update_text(
            id,
            TextChanges {
                content: Some("HEY".into()),
                ..Default::default()
            },
        )
        .expect("update");
        assert_relative_eq!(reg.get(id).expect("c").scale, 2.0);
    }

    #[test]
    fn test_update_text_rejects_what_never_fits() {
        let mut reg = registry();
        let id = reg.add_text("HI", 24, "Arial").expect("add");
        let result = reg.update_text(
            id,
            TextChanges {
                content: Some("M".repeat(250)),
                font_size: Some(72),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let c = reg.get(id).expect("c");
        assert_eq!(c.name, "HI");
        assert_relative_eq!(c.scale, 1.0);
    }

    #[test]
    fn test_large_upload_keeps_intrinsic_size() {
        let mut config = EditorConfig::default();
        config.export.max_texture_size = 256;
        let card = Card::new(&config.card);
        let mut reg =
            ComponentRegistry::new(&config, *card.dimensions(), Box::new(BlockRasterizer::default()));

        let huge = r##"<svg xmlns="http://www.w3.org/2000/svg" width="60000" height="60000"><rect width="60000" height="60000"/></svg>"##;
        let id = reg
            .add_vector_graphic("huge.svg", huge.as_bytes(), 100)
            .expect("add");
        let c = reg.get(id).expect("c");
        let graphic = c.as_graphic().expect("graphic");
        assert_eq!((graphic.original_width, graphic.original_height), (60000, 60000));
        assert_eq!(c.quad.texture.dimensions(), (256, 256));
        // Fitted like any square: 80% of the card height
        assert_relative_eq!(c.quad.height, 5.398 * 0.8, epsilon = 1e-4);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut reg = registry();
        let id = reg.add_text("HELLO", 24, "Arial").expect("add");
        reg.select(id).expect("select");
        reg.remove(id).expect("remove");
        assert_eq!(reg.len(), 0);
        assert_eq!(reg.selected(), None);
        assert!(matches!(reg.remove(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_keeps_others() {
        let mut reg = registry();
        let a = reg.add_text("A", 24, "Arial").expect("add");
        let b = reg.add_text("B", 24, "Arial").expect("add");
        reg.place(a, Vec2::new(1.0, 1.0)).expect("place");
        reg.select(a).expect("select");
        reg.remove(b).expect("remove");
        assert_eq!(reg.selected(), Some(a));
        assert_eq!(reg.get(a).expect("a").position, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_upload_two_phase() {
        let mut reg = registry();
        let ticket = reg.request_upload("logo.svg", Some("image/svg+xml")).expect("request");
        assert!(reg.is_pending(ticket.id()));
        assert_eq!(reg.len(), 0);

        let outcome = reg.complete_upload(ticket, SQUARE.as_bytes(), 100).expect("complete");
        assert_eq!(outcome, UploadOutcome::Applied(ticket.id()));
        assert_eq!(reg.get(ticket.id()).expect("c").name, "logo.svg");

        // Completing twice is a no-op
        let again = reg.complete_upload(ticket, SQUARE.as_bytes(), 100).expect("complete");
        assert_eq!(again, UploadOutcome::Cancelled);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_upload_cancelled_by_remove() {
        let mut reg = registry();
        let ticket = reg.request_upload("logo.svg", None).expect("request");
        reg.remove(ticket.id()).expect("cancel");
        let outcome = reg.complete_upload(ticket, SQUARE.as_bytes(), 100).expect("complete");
        assert_eq!(outcome, UploadOutcome::Cancelled);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_upload_rejects_other_files() {
        let mut reg = registry();
        assert!(matches!(
            reg.request_upload("photo.png", Some("image/png")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_place_clamps() {
        let mut reg = registry();
        let id = reg.add_text("HELLO", 24, "Arial").expect("add");
        let pos = reg.place(id, Vec2::new(50.0, 50.0)).expect("place");
        assert_relative_eq!(pos.x, 4.28 - 0.36, epsilon = 1e-5);
        assert_relative_eq!(pos.y, 2.699 - 0.12, epsilon = 1e-5);
    }

    #[test]
    fn test_rescale_bounds() {
        let mut reg = registry();
        let id = reg.add_text("HI", 24, "Arial").expect("add");

        assert!(reg.rescale(id, 0.01).expect("rescale"));
        assert_relative_eq!(reg.get(id).expect("c").scale, 0.1);

        // 0.288 wide: 5.0 fits, so the max applies
        assert!(reg.rescale(id, 9.0).expect("rescale"));
        assert_relative_eq!(reg.get(id).expect("c").scale, 5.0);

        let wide = reg
            .add_vector_graphic("square.svg", SQUARE.as_bytes(), 100)
            .expect("add");
        assert!(!reg.rescale(wide, 2.0).expect("rescale"));
        assert_relative_eq!(reg.get(wide).expect("c").scale, 1.0);
    }

    #[test]
    fn test_summaries_json() {
        let mut reg = registry();
        let id = reg.add_text("HELLO", 24, "Arial").expect("add");
        reg.select(id).expect("select");
        let json = serde_json::to_value(reg.summaries()).expect("json");
        assert_eq!(json[0]["name"], "HELLO");
        assert_eq!(json[0]["kind"], "text");
        assert_eq!(json[0]["selected"], true);
        assert_eq!(json[0]["font_size"], 24);
        assert!(json[0].get("size_percent").is_none());
    }
}
