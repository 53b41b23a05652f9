//! Renderable scene snapshots
//!
//! A [`SceneSnapshot`] is a self-contained copy of the card and its visible
//! components with world transforms, materials, lights and background. The
//! live editor view and every exporter draw from a snapshot, so an export
//! never touches (or is affected by) the session it was taken from.

use crate::card::Card;
use crate::color::Rgb;
use crate::component::ComponentId;
use crate::mesh::Mesh;
use crate::registry::ComponentRegistry;
use glam::{Mat4, Quat, Vec3};
use image::RgbaImage;
use std::sync::Arc;

/// Surface appearance, modelled on a metallic-roughness material
#[derive(Debug, Clone)]
pub struct Material {
    pub base_color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    /// Constant light added regardless of lighting (RGB, 0-1)
    pub emissive: [f32; 3],
    /// Straight-alpha texture multiplied with the base color
    pub texture: Option<Arc<RgbaImage>>,
    /// Blend by texture alpha instead of drawing opaque
    pub transparent: bool,
}

impl Material {
    /// Matte plastic body of the card
    pub fn card(color: Rgb) -> Self {
        Self {
            base_color: color,
            metalness: 0.2,
            roughness: 0.7,
            emissive: [0.0; 3],
            texture: None,
            transparent: false,
        }
    }

    /// Glossy metallic print for component quads
    pub fn print(texture: Arc<RgbaImage>) -> Self {
        let glow = 0x40 as f32 / 255.0 * 0.2;
        Self {
            base_color: Rgb::WHITE,
            metalness: 0.8,
            roughness: 0.2,
            emissive: [glow; 3],
            texture: Some(texture),
            transparent: true,
        }
    }
}

/// What a node was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSource {
    Card,
    Component(ComponentId),
}

/// A mesh placed in the world with translation/rotation/scale
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub source: NodeSource,
    pub mesh: Arc<Mesh>,
    pub material: Material,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl SceneNode {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Rgb,
        intensity: f32,
    },
    /// Light shining from `position` towards the origin
    Directional {
        color: Rgb,
        intensity: f32,
        position: Vec3,
    },
}

/// A set of lights
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub lights: Vec<Light>,
}

impl Lighting {
    /// Interactive view: full ambient plus four weak lights from the front corners
    pub fn editor() -> Self {
        let mut lights = vec![Light::Ambient {
            color: Rgb::WHITE,
            intensity: 1.0,
        }];
        for (x, y) in [(15.0, 5.0), (15.0, -5.0), (-15.0, 5.0), (-15.0, -5.0)] {
            lights.push(Light::Directional {
                color: Rgb::WHITE,
                intensity: 0.2,
                position: Vec3::new(x, y, 25.0),
            });
        }
        Self { lights }
    }

    /// Even lighting for rendered exports
    pub fn export() -> Self {
        Self {
            lights: vec![
                Light::Ambient {
                    color: Rgb::WHITE,
                    intensity: 1.0,
                },
                Light::Directional {
                    color: Rgb::WHITE,
                    intensity: 1.0,
                    position: Vec3::new(0.0, 0.0, 10.0),
                },
                Light::Directional {
                    color: Rgb::WHITE,
                    intensity: 0.5,
                    position: Vec3::new(0.0, 0.0, -10.0),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Radial gradient from the center outwards
    Gradient { center: Rgb, edge: Rgb },
    Solid(Rgb),
    Transparent,
}

impl Background {
    /// Default editor backdrop
    pub const STUDIO: Self = Self::Gradient {
        center: Rgb::from_hex(0x2c3e50),
        edge: Rgb::from_hex(0x1a1a1a),
    };

    pub const GREENSCREEN: Self = Self::Solid(Rgb::GREENSCREEN);
}

impl Default for Background {
    fn default() -> Self {
        Self::STUDIO
    }
}

/// Everything a renderer or exporter needs, detached from the session
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    /// Card first, then visible components in insertion order
    pub nodes: Vec<SceneNode>,
    pub lighting: Lighting,
    pub background: Background,
}

impl SceneSnapshot {
    pub fn capture(
        card: &Card,
        registry: &ComponentRegistry,
        lighting: Lighting,
        background: Background,
    ) -> Self {
        let surface_z = card.dimensions().surface_z();

        let mut nodes = vec![SceneNode {
            name: "card".to_string(),
            source: NodeSource::Card,
            mesh: Arc::clone(card.mesh()),
            material: Material::card(card.color.rgb()),
            translation: Vec3::ZERO,
            rotation: Quat::from_rotation_y(card.rotation_y),
            scale: Vec3::ONE,
        }];

        nodes.extend(registry.all().filter(|c| c.quad.visible).map(|c| SceneNode {
            name: c.name.clone(),
            source: NodeSource::Component(c.id),
            mesh: Arc::clone(&c.quad.mesh),
            material: Material::print(Arc::clone(&c.quad.texture)),
            translation: c.position.extend(surface_z),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(c.scale, c.scale, 1.0),
        }));

        Self {
            nodes,
            lighting,
            background,
        }
    }

    pub fn node(&self, source: NodeSource) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.source == source)
    }
}
