//! cloudcard render - camera, orbit controls and a wgpu renderer
//!
//! The renderer draws [`SceneSnapshot`](cloudcard_core::scene::SceneSnapshot)s
//! offscreen and reads them back as RGBA frames, so the same code serves
//! the browser host (frames are blitted onto a canvas), headless CLI renders
//! and PNG export.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cloudcard_render::{Camera, GpuDevice, GpuRenderer};
//!
//! let gpu = GpuDevice::headless_blocking()?;
//! let mut renderer = GpuRenderer::new(&gpu, 1280, 720);
//! let mut camera = Camera::default();
//! camera.set_viewport(1280, 720);
//! let frame = renderer.render(&scene, &camera)?;
//! ```

pub mod camera;
pub mod controls;
pub mod gpu;
pub mod picking;

pub use camera::{Camera, screen_to_ndc};
pub use controls::OrbitControls;
pub use gpu::{GpuDevice, GpuRenderer, Presenter, RenderError};
pub use picking::{Ray, ray_mesh_intersect, ray_triangle_intersect};

// Re-export wgpu for hosts that bring their own device
pub use wgpu;
