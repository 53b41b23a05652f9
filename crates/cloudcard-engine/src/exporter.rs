//! Export of the current session
//!
//! Exports read the session and never change it. Each one produces an
//! [`Artifact`] carrying the file bytes and the ids of any components that
//! had to be left out.

use crate::session::Session;
use cloudcard_core::export::{
    Artifact, ExportKind, GlbOptions, build_svg_document, encode_png, print_size_px, write_glb,
};
use cloudcard_core::scene::{Background, Lighting, SceneSnapshot};
use cloudcard_core::{Error, Result};
use cloudcard_render::{Camera, GpuDevice, GpuRenderer};
use glam::{UVec2, Vec2};

/// Millimeter-accurate SVG drawing of the card face
pub fn export_svg(session: &Session) -> Artifact {
    let (document, skipped) = build_svg_document(
        &session.card,
        &session.registry,
        session.config.export.accent_color,
    );
    if !skipped.is_empty() {
        tracing::warn!("SVG export left out {} component(s)", skipped.len());
    }

    Artifact {
        kind: ExportKind::Svg,
        bytes: document.into_bytes(),
        skipped,
    }
}

/// Everything the print render needs, detached from the session
///
/// The job owns its scene, so it can outlive the borrow of the session
/// while the GPU works.
pub struct PrintJob {
    scene: SceneSnapshot,
    camera: Camera,
    size: UVec2,
}

impl PrintJob {
    /// Card face at the configured DPI with a transparent background
    pub fn new(session: &Session) -> Self {
        let shape = session.card.document_shape();
        let size = print_size_px(Vec2::new(shape.width, shape.height), session.config.export.dpi);

        Self {
            scene: SceneSnapshot::capture(
                &session.card,
                &session.registry,
                Lighting::export(),
                Background::Transparent,
            ),
            camera: Camera::from_config(&session.config.render, size.x as f32 / size.y as f32),
            size,
        }
    }

    /// Output size in pixels
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Render on the given device and encode the image as PNG
    pub async fn run(self, gpu: &GpuDevice) -> Result<Artifact> {
        let mut renderer = GpuRenderer::new(gpu, self.size.x, self.size.y);
        let frame = renderer
            .render_async(&self.scene, &self.camera)
            .await
            .map_err(|e| Error::Export(e.to_string()))?;
        let bytes = encode_png(frame)?;

        tracing::info!("Rendered {}x{} print image", self.size.x, self.size.y);
        Ok(Artifact::new(ExportKind::Png, bytes))
    }
}

/// Print render at the configured DPI with a transparent background
#[cfg(not(target_arch = "wasm32"))]
pub fn export_png(session: &Session, gpu: &GpuDevice) -> Result<Artifact> {
    pollster::block_on(PrintJob::new(session).run(gpu))
}

/// Binary glTF of the card and its visible components
pub fn export_glb(session: &Session) -> Result<Artifact> {
    let scene = SceneSnapshot::capture(
        &session.card,
        &session.registry,
        Lighting::export(),
        Background::Transparent,
    );
    let options = GlbOptions {
        max_texture_size: session.config.export.max_texture_size,
    };
    let (bytes, skipped) = write_glb(&scene, &options)?;
    if !skipped.is_empty() {
        tracing::warn!("GLB export left out {} component(s)", skipped.len());
    }

    Ok(Artifact {
        kind: ExportKind::Glb,
        bytes,
        skipped,
    })
}
