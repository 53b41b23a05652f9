//! Per-frame update
//!
//! One tick advances the auto-rotation, lets the orbit controls apply any
//! pending motion and hands the current scene to a presenter. The host
//! decides how often to tick (the browser on animation frames, the CLI in
//! a plain loop).

use crate::session::Session;
use cloudcard_core::scene::SceneSnapshot;
use cloudcard_render::{Presenter, RenderError};

/// Frame counter plus the tick itself
#[derive(Debug, Default)]
pub struct RenderLoop {
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames advanced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance the session by one frame and capture the scene to draw
    ///
    /// Hosts that render asynchronously call this and draw the snapshot
    /// themselves; everyone else uses [`RenderLoop::tick`].
    pub fn advance(&mut self, session: &mut Session) -> SceneSnapshot {
        if session.view.auto_rotate {
            session.card.rotation_y += session.config.render.auto_rotate_speed;
        }
        session.controls.update(&mut session.camera);
        self.frames += 1;
        session.snapshot()
    }

    /// Advance the session by one frame and present it
    pub fn tick(&mut self, session: &mut Session, presenter: &mut dyn Presenter) -> Result<(), RenderError> {
        let scene = self.advance(session);
        presenter.present(&scene, &session.camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudcard_core::config::EditorConfig;
    use cloudcard_core::scene::NodeSource;
    use cloudcard_core::texture::BlockRasterizer;
    use cloudcard_render::Camera;

    /// Records what it was asked to present
    #[derive(Default)]
    struct Recorder {
        card_rotations: Vec<glam::Quat>,
        node_counts: Vec<usize>,
    }

    impl Presenter for Recorder {
        fn present(&mut self, scene: &SceneSnapshot, _camera: &Camera) -> Result<(), RenderError> {
            let card = scene.node(NodeSource::Card).map(|n| n.rotation).unwrap_or_default();
            self.card_rotations.push(card);
            self.node_counts.push(scene.nodes.len());
            Ok(())
        }
    }

    fn session() -> Session {
        Session::new(EditorConfig::default(), Box::new(BlockRasterizer::default()))
    }

    #[test]
    fn test_tick_presents_scene() {
        let mut s = session();
        s.registry.add_text("HELLO", 24, "Arial").expect("add");
        let mut presenter = Recorder::default();
        let mut frames = RenderLoop::new();

        frames.tick(&mut s, &mut presenter).expect("tick");
        assert_eq!(frames.frames(), 1);
        assert_eq!(presenter.node_counts, vec![2]);
    }

    #[test]
    fn test_auto_rotate_advances_card() {
        let mut s = session();
        let mut presenter = Recorder::default();
        let mut frames = RenderLoop::new();

        frames.tick(&mut s, &mut presenter).expect("tick");
        assert_relative_eq!(s.card.rotation_y, 0.0);

        s.toggle_auto_rotate();
        for _ in 0..10 {
            frames.tick(&mut s, &mut presenter).expect("tick");
        }
        let speed = s.config.render.auto_rotate_speed;
        assert_relative_eq!(s.card.rotation_y, speed * 10.0, epsilon = 1e-5);
        assert_ne!(presenter.card_rotations[0], presenter.card_rotations[10]);
    }

    #[test]
    fn test_advance_without_presenter() {
        let mut s = session();
        s.registry.add_text("HELLO", 24, "Arial").expect("add");
        s.toggle_auto_rotate();
        let mut frames = RenderLoop::new();

        let scene = frames.advance(&mut s);
        assert_eq!(frames.frames(), 1);
        assert_eq!(scene.nodes.len(), 2);
        assert!(s.card.rotation_y > 0.0);
    }

    #[test]
    fn test_preview_camera_eases_between_ticks() {
        let mut s = session();
        s.toggle_preview();
        s.controls.rotate(50.0, 0.0, 600.0);

        let mut presenter = Recorder::default();
        let mut frames = RenderLoop::new();
        frames.tick(&mut s, &mut presenter).expect("tick");
        let after_one = s.camera.position;
        frames.tick(&mut s, &mut presenter).expect("tick");
        assert!(s.camera.position.distance(after_one) > 0.0);
    }
}
