//! The card the components are placed on
//!
//! Scene units are centimeters: the physical millimeter dimensions are
//! divided by ten, which keeps the card comfortably sized in front of a
//! camera eight units away.

use crate::color::CardColor;
use crate::config::CardConfig;
use crate::geometry::{Bevel, CURVE_SEGMENTS, Outline, RoundedRect, extrude};
use crate::mesh::Mesh;
use glam::Vec2;
use std::sync::Arc;

/// Scene units per millimeter
pub const UNITS_PER_MM: f32 = 0.1;

/// Components float this far in front of the card face
pub const SURFACE_OFFSET: f32 = 0.01;

/// Card dimensions in scene units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardDimensions {
    pub width: f32,
    pub height: f32,
    pub thickness: f32,
    pub corner_radius: f32,
}

impl CardDimensions {
    pub fn from_config(config: &CardConfig) -> Self {
        Self {
            width: config.width_mm * UNITS_PER_MM,
            height: config.height_mm * UNITS_PER_MM,
            thickness: config.thickness_mm * UNITS_PER_MM,
            corner_radius: config.corner_radius_mm * UNITS_PER_MM,
        }
    }

    /// Width and height of the face
    pub fn extents(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn half_extents(&self) -> Vec2 {
        self.extents() * 0.5
    }

    /// Width and height in millimeters
    pub fn extents_mm(&self) -> Vec2 {
        self.extents() / UNITS_PER_MM
    }

    /// Depth of the plane the components lie on
    pub fn surface_z(&self) -> f32 {
        self.thickness + SURFACE_OFFSET
    }

    /// Clamp a component center so a `size`-sized box around it stays on the card
    ///
    /// An element larger than the card on some axis is centered on that axis.
    pub fn clamp_center(&self, center: Vec2, size: Vec2) -> Vec2 {
        let limit = (self.half_extents() - size * 0.5).max(Vec2::ZERO);
        center.clamp(-limit, limit)
    }

    /// Whether a `size`-sized element fits on the card at all
    pub fn fits(&self, size: Vec2) -> bool {
        size.x <= self.width && size.y <= self.height
    }

    /// Largest uniform scale at which a `size`-sized element still fits
    pub fn max_fitting_scale(&self, size: Vec2) -> f32 {
        let axis = |limit: f32, extent: f32| {
            if extent > 0.0 { limit / extent } else { f32::INFINITY }
        };
        axis(self.width, size.x).min(axis(self.height, size.y))
    }
}

/// The card: fixed silhouette and solid, plus the mutable look
#[derive(Debug, Clone)]
pub struct Card {
    dimensions: CardDimensions,
    document_shape: RoundedRect,
    outline: Outline,
    mesh: Arc<Mesh>,
    /// Body color from the palette
    pub color: CardColor,
    /// Rotation about the Y axis in radians
    pub rotation_y: f32,
}

impl Card {
    pub fn new(config: &CardConfig) -> Self {
        let dimensions = CardDimensions::from_config(config);
        let outline = RoundedRect::centered(
            dimensions.width,
            dimensions.height,
            dimensions.corner_radius,
        )
        .outline(CURVE_SEGMENTS);

        let bevel = config.bevel.map(|b| Bevel {
            thickness: dimensions.thickness * b.thickness_ratio,
            size: dimensions.thickness * b.size_ratio,
            segments: b.segments,
        });
        let mesh = extrude(&outline, dimensions.thickness, bevel);

        tracing::debug!(
            "Card built: {:.3}x{:.3}x{:.3} units, {} triangles",
            dimensions.width,
            dimensions.height,
            dimensions.thickness,
            mesh.triangle_count()
        );

        Self {
            dimensions,
            document_shape: RoundedRect {
                origin: Vec2::ZERO,
                width: config.width_mm,
                height: config.height_mm,
                radius: config.corner_radius_mm,
            },
            outline,
            mesh: Arc::new(mesh),
            color: CardColor::default(),
            rotation_y: 0.0,
        }
    }

    pub fn dimensions(&self) -> &CardDimensions {
        &self.dimensions
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Rounded-rect path in millimeters with the origin at the top-left corner
    pub fn document_shape(&self) -> RoundedRect {
        self.document_shape
    }
}

impl Default for Card {
    fn default() -> Self {
        Self::new(&CardConfig::default())
    }
}
