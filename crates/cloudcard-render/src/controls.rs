//! Orbit controls
//!
//! Drag rotates the camera around its target on a sphere, the wheel
//! dollies it in and out. Input only accumulates a pending delta;
//! [`OrbitControls::update`] applies it once per frame and, with damping
//! enabled, lets a fraction of it carry over so motion eases out.

use crate::camera::Camera;
use cloudcard_core::config::RenderConfig;
use glam::Vec3;
use std::f32::consts::{PI, TAU};

const EPS: f32 = 1e-6;

/// Camera orbiting a fixed target; no panning
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Whether pointer input is accepted
    pub enabled: bool,
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl OrbitControls {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            enabled: false,
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels on a viewport `height` pixels tall
    ///
    /// A drag across the full height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        if !self.enabled {
            return;
        }
        let height = height.max(1.0);
        self.delta_theta -= TAU * dx / height * self.rotate_speed;
        self.delta_phi -= TAU * dy / height * self.rotate_speed;
    }

    /// Dolly for a wheel event; negative `delta_y` moves closer
    pub fn zoom(&mut self, delta_y: f32) {
        if !self.enabled || delta_y == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Whether input is still being applied
    pub fn is_settling(&self) -> bool {
        self.delta_theta.abs() > EPS || self.delta_phi.abs() > EPS || (self.scale - 1.0).abs() > EPS
    }

    /// Apply pending motion to the camera; returns whether it moved
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length().max(EPS);

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * factor;
        phi += self.delta_phi * factor;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let new_position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        let moved = new_position.distance_squared(camera.position) > EPS;
        camera.position = new_position;
        camera.target = self.target;
        moved
    }
}
