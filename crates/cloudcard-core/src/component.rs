//! Placed card elements
//!
//! A component is a textured quad lying on the card face. Its transform is
//! a 2D position in the card plane (scene units, card center at the origin)
//! plus a uniform scale; everything else is type-specific.

use crate::mesh::Mesh;
use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a component; unique for the lifetime of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a component without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKindTag {
    Text,
    VectorGraphic,
}

impl fmt::Display for ComponentKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::VectorGraphic => "vector graphic",
        })
    }
}

/// Text component settings
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub content: String,
    pub font_family: String,
    /// Font size in pixels
    pub font_size: u32,
}

/// Imported vector graphic settings
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicData {
    /// Uploaded document, as received
    pub source: String,
    /// Intrinsic pixel size of the document
    pub original_width: u32,
    pub original_height: u32,
    pub size_percent: u32,
    /// Scene units per source pixel at scale 1
    pub fit_scale: f32,
}

impl GraphicData {
    /// Scene units per source pixel for the given percentage
    ///
    /// The graphic is fitted inside the card at 100% and then shrunk by
    /// `fit_factor` so a fresh upload never touches the edges.
    pub fn fit_scale_for(
        card_size: Vec2,
        original_width: u32,
        original_height: u32,
        size_percent: u32,
        fit_factor: f32,
    ) -> f32 {
        let sx = card_size.x / original_width.max(1) as f32;
        let sy = card_size.y / original_height.max(1) as f32;
        sx.min(sy) * size_percent as f32 / 100.0 * fit_factor
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Text(TextData),
    VectorGraphic(GraphicData),
}

impl ComponentKind {
    pub fn tag(&self) -> ComponentKindTag {
        match self {
            Self::Text(_) => ComponentKindTag::Text,
            Self::VectorGraphic(_) => ComponentKindTag::VectorGraphic,
        }
    }
}

/// The textured quad a component is drawn with
#[derive(Debug, Clone)]
pub struct RenderQuad {
    /// Unscaled size in scene units
    pub width: f32,
    pub height: f32,
    pub mesh: Arc<Mesh>,
    /// Straight-alpha RGBA texture, top row first
    pub texture: Arc<RgbaImage>,
    pub visible: bool,
}

impl RenderQuad {
    pub fn new(width: f32, height: f32, texture: RgbaImage) -> Self {
        Self {
            width,
            height,
            mesh: Arc::new(Mesh::plane(width, height)),
            texture: Arc::new(texture),
            visible: true,
        }
    }

    /// Change the quad size, keeping the texture
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.mesh = Arc::new(Mesh::plane(width, height));
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// A placed element
#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    /// Display name: the text itself, or the uploaded file name
    pub name: String,
    pub kind: ComponentKind,
    pub quad: RenderQuad,
    pub position: Vec2,
    pub scale: f32,
}

impl Component {
    pub fn new(id: ComponentId, name: impl Into<String>, kind: ComponentKind, quad: RenderQuad) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            quad,
            position: Vec2::ZERO,
            scale: 1.0,
        }
    }

    pub fn tag(&self) -> ComponentKindTag {
        self.kind.tag()
    }

    pub fn as_text(&self) -> Option<&TextData> {
        match &self.kind {
            ComponentKind::Text(text) => Some(text),
            ComponentKind::VectorGraphic(_) => None,
        }
    }

    pub fn as_graphic(&self) -> Option<&GraphicData> {
        match &self.kind {
            ComponentKind::VectorGraphic(graphic) => Some(graphic),
            ComponentKind::Text(_) => None,
        }
    }

    /// Size of the quad on the card after scaling
    pub fn scaled_size(&self) -> Vec2 {
        self.quad.size() * self.scale
    }

    /// World transform of the quad for a given surface depth
    pub fn transform(&self, surface_z: f32) -> Mat4 {
        Mat4::from_translation(self.position.extend(surface_z))
            * Mat4::from_scale(Vec3::new(self.scale, self.scale, 1.0))
    }
}
