//! Editor session state
//!
//! A [`Session`] holds everything one editing session works on: the card,
//! the component registry, the current mode, view toggles, and the camera
//! with its orbit controls. The interaction controller, render loop and
//! exporter all receive the session explicitly.

use cloudcard_core::card::Card;
use cloudcard_core::color::CardColor;
use cloudcard_core::config::EditorConfig;
use cloudcard_core::registry::ComponentRegistry;
use cloudcard_core::scene::{Background, Lighting, SceneSnapshot};
use cloudcard_core::texture::TextRasterizer;
use cloudcard_render::{Camera, OrbitControls};
use glam::{UVec2, Vec2};
use serde::Serialize;

/// What pointer input does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Pointer drags and scales components
    #[default]
    Edit,
    /// Pointer orbits and zooms the camera
    Preview,
}

/// Toggles of the editor view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ViewSettings {
    pub greenscreen: bool,
    pub auto_rotate: bool,
}

impl ViewSettings {
    pub fn background(&self) -> Background {
        if self.greenscreen {
            Background::GREENSCREEN
        } else {
            Background::STUDIO
        }
    }
}

/// One editing session
pub struct Session {
    pub config: EditorConfig,
    pub card: Card,
    pub registry: ComponentRegistry,
    pub view: ViewSettings,
    pub camera: Camera,
    pub controls: OrbitControls,
    mode: Mode,
    viewport: UVec2,
}

impl Session {
    pub fn new(config: EditorConfig, rasterizer: Box<dyn TextRasterizer>) -> Self {
        let card = Card::new(&config.card);
        let registry = ComponentRegistry::new(&config, *card.dimensions(), rasterizer);
        let viewport = UVec2::new(
            config.render.viewport_width.max(1),
            config.render.viewport_height.max(1),
        );
        let camera = Camera::from_config(&config.render, viewport.x as f32 / viewport.y as f32);
        let controls = OrbitControls::from_config(&config.render);

        Self {
            config,
            card,
            registry,
            view: ViewSettings::default(),
            camera,
            controls,
            mode: Mode::Edit,
            viewport,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch mode; orbit controls only take input in preview
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::info!("Mode: {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.controls.enabled = mode == Mode::Preview;
    }

    pub fn toggle_preview(&mut self) -> Mode {
        self.set_mode(match self.mode {
            Mode::Edit => Mode::Preview,
            Mode::Preview => Mode::Edit,
        });
        self.mode
    }

    pub fn toggle_greenscreen(&mut self) -> bool {
        self.view.greenscreen = !self.view.greenscreen;
        tracing::debug!("Greenscreen: {}", self.view.greenscreen);
        self.view.greenscreen
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.view.auto_rotate = !self.view.auto_rotate;
        tracing::debug!("Auto-rotate: {}", self.view.auto_rotate);
        self.view.auto_rotate
    }

    pub fn set_card_color(&mut self, color: CardColor) {
        tracing::debug!("Card color: {}", color.name());
        self.card.color = color;
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport.as_vec2()
    }

    /// Resize the view; the camera aspect follows
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::warn!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.viewport = UVec2::new(width, height);
        self.camera.set_viewport(width, height);
    }

    /// The editor view as a renderable scene
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::capture(
            &self.card,
            &self.registry,
            Lighting::editor(),
            self.view.background(),
        )
    }
}
