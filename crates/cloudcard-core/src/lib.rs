//! # cloudcard core
//!
//! Card geometry, placed components and export formats.
//!
//! The card is an extruded rounded rectangle; text and imported SVG
//! artwork are placed on its front face as textured quads, kept in a
//! [`ComponentRegistry`](registry::ComponentRegistry), and exported as an
//! SVG drawing or a GLB asset (PNG export lives in the engine, which owns a
//! renderer).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cloudcard_core::prelude::*;
//!
//! let config = EditorConfig::default();
//! let card = Card::new(&config.card);
//! let mut registry = ComponentRegistry::new(
//!     &config,
//!     *card.dimensions(),
//!     Box::new(CosmicTextRasterizer::new()),
//! );
//!
//! let id = registry.add_text("JANE DOE", 24, "Arial")?;
//! registry.place(id, Vec2::new(-2.0, -1.8))?;
//!
//! let (svg, _skipped) = build_svg_document(&card, &registry, Rgb::SILVER);
//! ```
//!
//! ## Units and Conventions
//!
//! - **Scene units**: centimeters. Card dimensions are configured in
//!   millimeters and divided by ten.
//! - **Card plane**: the card is centered on the origin, front face towards
//!   +Z, Y up. Component positions are 2D offsets in that plane.
//! - **Documents**: SVG exports use millimeters with a top-left origin.

pub mod card;
pub mod color;
pub mod component;
pub mod config;
pub mod export;
pub mod geometry;
pub mod mesh;
pub mod registry;
pub mod scene;
pub mod texture;

mod error;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Card
    pub use crate::card::{Card, CardDimensions, UNITS_PER_MM};
    pub use crate::color::{CardColor, Rgb};
    pub use crate::geometry::{Outline, RoundedRect, extrude};
    pub use crate::mesh::{Mesh, Vertex};

    // Components
    pub use crate::component::{Component, ComponentId, ComponentKind, ComponentKindTag};
    pub use crate::registry::{
        ComponentRegistry, ComponentSummary, TextChanges, UploadOutcome, UploadTicket,
    };
    pub use crate::texture::{BlockRasterizer, CosmicTextRasterizer, TextRasterizer};

    // Scene and export
    pub use crate::export::{Artifact, ExportKind, GlbOptions, build_svg_document, write_glb};
    pub use crate::scene::{Background, Lighting, SceneSnapshot};

    // Configuration
    pub use crate::config::{EditorConfig, load_config, load_config_or_default};

    // Math (re-export glam)
    pub use glam::{Mat4, Quat, Vec2, Vec3};

    // Error handling
    pub use crate::{Error, Result};
}
