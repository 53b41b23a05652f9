//! Pointer, wheel and keyboard input
//!
//! In edit mode a press on a component grabs it: it becomes selected and
//! follows the pointer across the card face until release, always kept
//! fully on the card. The wheel rescales the selection. In preview mode
//! the same input orbits and zooms the camera instead.

use crate::session::{Mode, Session};
use cloudcard_core::component::ComponentId;
use cloudcard_core::{Error, Result};
use cloudcard_render::ray_mesh_intersect;
use glam::{Vec2, Vec3};
use std::str::FromStr;

/// Hits closer together than this count as a tie
const TIE_EPSILON: f32 = 1e-5;

/// Drag state of the edit-mode pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ComponentId),
}

/// Nudge direction in the card plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn offset(self, step: f32) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, step),
            Self::Down => Vec2::new(0.0, -step),
            Self::Left => Vec2::new(-step, 0.0),
            Self::Right => Vec2::new(step, 0.0),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(Error::InvalidInput(format!("unknown direction '{}'", other))),
        }
    }
}

/// Turns raw input events into session changes
#[derive(Debug, Default)]
pub struct InteractionController {
    state: DragState,
    /// Last pointer position of a preview-mode drag
    orbit_from: Option<Vec2>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Press at a pixel of the viewport
    ///
    /// Returns the grabbed component, if any. Pressing empty space leaves
    /// the selection as it is.
    pub fn pointer_down(&mut self, session: &mut Session, pixel: Vec2) -> Option<ComponentId> {
        match session.mode() {
            Mode::Preview => {
                self.orbit_from = Some(pixel);
                None
            }
            Mode::Edit => {
                let hit = hit_test(session, pixel)?;
                // The hit came from the registry, so selecting it cannot fail
                if session.registry.select(hit).is_ok() {
                    self.state = DragState::Dragging(hit);
                    tracing::debug!("Dragging {}", hit);
                }
                Some(hit)
            }
        }
    }

    /// Pointer motion; moves the dragged component or orbits the camera
    ///
    /// A drag whose component was removed ends with `NotFound`.
    pub fn pointer_move(&mut self, session: &mut Session, pixel: Vec2) -> Result<()> {
        match session.mode() {
            Mode::Preview => {
                if let Some(from) = self.orbit_from.replace(pixel) {
                    let delta = pixel - from;
                    let height = session.viewport_size().y;
                    session.controls.rotate(delta.x, delta.y, height);
                }
                Ok(())
            }
            Mode::Edit => {
                let DragState::Dragging(id) = self.state else {
                    return Ok(());
                };
                if session.registry.get(id).is_none() {
                    self.state = DragState::Idle;
                    return Err(Error::NotFound(id));
                }

                let ray = session
                    .camera
                    .ray_from_screen(pixel, session.viewport_size());
                let plane_z = session.card.dimensions().surface_z();
                if let Some(hit) = ray.intersect_plane(Vec3::new(0.0, 0.0, plane_z), Vec3::Z) {
                    session.registry.place(id, hit.truncate())?;
                }
                Ok(())
            }
        }
    }

    /// Release; always returns to idle
    pub fn pointer_up(&mut self) {
        if let DragState::Dragging(id) = self.state {
            tracing::debug!("Released {}", id);
        }
        self.state = DragState::Idle;
        self.orbit_from = None;
    }

    /// Wheel step; scales the selection in edit mode, zooms in preview
    ///
    /// Returns whether anything changed. A step that would make the
    /// selection larger than the card is rejected.
    pub fn wheel(&mut self, session: &mut Session, delta_y: f32) -> Result<bool> {
        if session.mode() == Mode::Preview {
            session.controls.zoom(delta_y);
            return Ok(delta_y != 0.0);
        }

        let id = session.registry.selected().ok_or(Error::NoSelection)?;
        let current = session.registry.get(id).ok_or(Error::NotFound(id))?.scale;
        let step = session.config.interaction.scale_step;
        let target = if delta_y < 0.0 {
            current + step
        } else {
            current - step
        };
        if !session.registry.rescale(id, target)? {
            return Ok(false);
        }
        // Pinned at a bound, the clamped target is the current scale
        let scale = session.registry.get(id).ok_or(Error::NotFound(id))?.scale;
        Ok(scale != current)
    }

    /// Move the selection one step, whatever the pointer is doing
    pub fn nudge(&mut self, session: &mut Session, direction: Direction) -> Result<Vec2> {
        let id = session.registry.selected().ok_or(Error::NoSelection)?;
        let step = session.config.interaction.move_step;
        session.registry.translate(id, direction.offset(step))
    }
}

/// Component under a pixel; the nearest wins, ties go to the most recent
pub fn hit_test(session: &Session, pixel: Vec2) -> Option<ComponentId> {
    let ray = session
        .camera
        .ray_from_screen(pixel, session.viewport_size());
    let surface_z = session.card.dimensions().surface_z();

    let mut best: Option<(ComponentId, f32)> = None;
    for component in session.registry.all().rev().filter(|c| c.quad.visible) {
        let Some(t) = ray_mesh_intersect(&ray, &component.quad.mesh, component.transform(surface_z))
        else {
            continue;
        };
        if best.is_none_or(|(_, nearest)| t < nearest - TIE_EPSILON) {
            best = Some((component.id, t));
        }
    }
    best.map(|(id, _)| id)
}
