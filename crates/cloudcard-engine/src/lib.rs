//! cloudcard engine - the card editor runtime
//!
//! The [`Editor`] is a thin orchestration layer over an editing
//! [`Session`]: it routes pointer, wheel and keyboard input through the
//! interaction controller, ticks the render loop into its own GPU
//! renderer, and produces export artifacts.
//!
//! Native hosts let the editor create a headless device on first use. The
//! browser host creates the device asynchronously and attaches it, then
//! draws the snapshots from [`Editor::advance_frame`] itself.
//!
//! ## Example
//!
//! ```ignore
//! use cloudcard_engine::{Editor, EditorConfig, ExportKind};
//!
//! let mut editor = Editor::new(EditorConfig::default());
//!
//! let id = editor.add_text("JANE DOE", 24, "Arial")?;
//! editor.select(id)?;
//! editor.wheel(-100.0)?; // grow by one step
//!
//! let frame = editor.frame()?; // RGBA pixels of the editor view (headless GPU)
//!
//! let artifact = editor.export(ExportKind::Png)?;
//! artifact.write_to_dir(std::path::Path::new("."))?;
//! ```

pub mod exporter;
pub mod interaction;
pub mod render_loop;
pub mod session;

use cloudcard_core::component::{Component, ComponentId};
use cloudcard_core::registry::{ComponentSummary, TextChanges, UploadOutcome, UploadTicket};
use cloudcard_core::scene::SceneSnapshot;
use cloudcard_core::texture::{CosmicTextRasterizer, TextRasterizer};
use glam::Vec2;
#[cfg(not(target_arch = "wasm32"))]
use image::RgbaImage;
use interaction::InteractionController;
use render_loop::RenderLoop;

// Re-export commonly used types from dependencies
pub use cloudcard_core::color::{CardColor, Rgb};
pub use cloudcard_core::config::{EditorConfig, load_config, load_config_or_default};
pub use cloudcard_core::export::{Artifact, ExportKind};
pub use cloudcard_core::{Error, Result};
pub use cloudcard_render::{Camera, GpuDevice, GpuRenderer, Presenter, RenderError};

// Re-export our own types
pub use exporter::PrintJob;
pub use interaction::{Direction, DragState, hit_test};
pub use session::{Mode, Session, ViewSettings};

/// The card editor
///
/// Provides a single interface for:
/// - Component management (text, vector graphics, uploads)
/// - Pointer, wheel and keyboard interaction
/// - Mode and view toggles
/// - Frame rendering
/// - Export to SVG, PNG and GLB
pub struct Editor {
    session: Session,
    interaction: InteractionController,
    render_loop: RenderLoop,
    gpu: Option<GpuDevice>,
    renderer: Option<GpuRenderer>,
}

impl Editor {
    /// Create an editor that rasterizes text with system fonts
    pub fn new(config: EditorConfig) -> Self {
        Self::with_rasterizer(config, Box::new(CosmicTextRasterizer::new()))
    }

    /// Create an editor with a specific text rasterizer
    pub fn with_rasterizer(config: EditorConfig, rasterizer: Box<dyn TextRasterizer>) -> Self {
        let session = Session::new(config, rasterizer);
        let viewport = session.viewport();
        tracing::info!("Editor ready at {}x{}", viewport.x, viewport.y);

        Self {
            session,
            interaction: InteractionController::new(),
            render_loop: RenderLoop::new(),
            gpu: None,
            renderer: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.session.config
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_text(&mut self, content: &str, font_size: u32, font_family: &str) -> Result<ComponentId> {
        self.session.registry.add_text(content, font_size, font_family)
    }

    pub fn update_text(&mut self, id: ComponentId, changes: TextChanges) -> Result<()> {
        self.session.registry.update_text(id, changes)
    }

    /// Add SVG artwork directly from its bytes
    pub fn add_vector_graphic(&mut self, name: &str, bytes: &[u8], size_percent: u32) -> Result<ComponentId> {
        self.session.registry.add_vector_graphic(name, bytes, size_percent)
    }

    pub fn update_graphic_size(&mut self, id: ComponentId, size_percent: u32) -> Result<()> {
        self.session.registry.update_graphic_size(id, size_percent)
    }

    /// Remove a component or cancel a pending upload
    pub fn remove(&mut self, id: ComponentId) -> Result<()> {
        if self.interaction.state() == DragState::Dragging(id) {
            self.interaction.pointer_up();
        }
        self.session.registry.remove(id)
    }

    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        self.session.registry.set_visible(id, visible)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.session.registry.get(id)
    }

    /// Component list in id order
    pub fn components(&self) -> Vec<ComponentSummary> {
        self.session.registry.summaries()
    }

    /// Register a font for text components
    pub fn load_font(&mut self, data: Vec<u8>) {
        self.session.registry.load_font(data);
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Reserve an id for a file the host is still reading
    pub fn request_upload(&mut self, file_name: &str, mime: Option<&str>) -> Result<UploadTicket> {
        self.session.registry.request_upload(file_name, mime)
    }

    /// Finish an upload; a cancelled reservation is not an error
    pub fn complete_upload(&mut self, ticket: UploadTicket, bytes: &[u8], size_percent: u32) -> Result<UploadOutcome> {
        self.session.registry.complete_upload(ticket, bytes, size_percent)
    }

    // ========================================================================
    // Selection and Interaction
    // ========================================================================

    pub fn select(&mut self, id: ComponentId) -> Result<()> {
        self.session.registry.select(id)
    }

    pub fn selected(&self) -> Option<ComponentId> {
        self.session.registry.selected()
    }

    pub fn clear_selection(&mut self) {
        self.session.registry.clear_selection();
    }

    pub fn pointer_down(&mut self, pixel: Vec2) -> Option<ComponentId> {
        self.interaction.pointer_down(&mut self.session, pixel)
    }

    pub fn pointer_move(&mut self, pixel: Vec2) -> Result<()> {
        self.interaction.pointer_move(&mut self.session, pixel)
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) -> Result<bool> {
        self.interaction.wheel(&mut self.session, delta_y)
    }

    pub fn nudge(&mut self, direction: Direction) -> Result<Vec2> {
        self.interaction.nudge(&mut self.session, direction)
    }

    /// Move a component to a card-plane position, clamped onto the card
    pub fn place(&mut self, id: ComponentId, position: Vec2) -> Result<Vec2> {
        self.session.registry.place(id, position)
    }

    /// Set a component's scale; `false` if it would not fit on the card
    pub fn set_scale(&mut self, id: ComponentId, scale: f32) -> Result<bool> {
        self.session.registry.rescale(id, scale)
    }

    pub fn drag_state(&self) -> DragState {
        self.interaction.state()
    }

    // ========================================================================
    // View
    // ========================================================================

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    /// Switch between edit and preview; any drag in progress ends
    pub fn toggle_preview(&mut self) -> Mode {
        self.interaction.pointer_up();
        self.session.toggle_preview()
    }

    pub fn toggle_greenscreen(&mut self) -> bool {
        self.session.toggle_greenscreen()
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.session.toggle_auto_rotate()
    }

    pub fn set_card_color(&mut self, color: CardColor) {
        self.session.set_card_color(color);
    }

    /// Resize the view; the frame follows on the next render
    pub fn resize(&mut self, width: u32, height: u32) {
        self.session.resize(width, height);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render on a device created by the host
    pub fn attach_gpu(&mut self, gpu: GpuDevice) {
        self.renderer = None;
        self.gpu = Some(gpu);
    }

    pub fn gpu(&self) -> Option<&GpuDevice> {
        self.gpu.as_ref()
    }

    /// The attached device, creating a headless one on first use
    #[cfg(not(target_arch = "wasm32"))]
    fn ensure_gpu(&mut self) -> std::result::Result<GpuDevice, RenderError> {
        if let Some(gpu) = &self.gpu {
            return Ok(gpu.clone());
        }
        let gpu = GpuDevice::headless_blocking()?;
        tracing::info!("Created headless GPU device");
        self.gpu = Some(gpu.clone());
        Ok(gpu)
    }

    /// Advance one frame and return the rendered view
    #[cfg(not(target_arch = "wasm32"))]
    pub fn frame(&mut self) -> std::result::Result<&RgbaImage, RenderError> {
        let gpu = self.ensure_gpu()?;
        let viewport = self.session.viewport();
        let renderer = self
            .renderer
            .get_or_insert_with(|| GpuRenderer::new(&gpu, viewport.x, viewport.y));
        renderer.resize(viewport.x, viewport.y);

        self.render_loop.tick(&mut self.session, renderer)?;
        Ok(renderer.frame())
    }

    /// Advance one frame into another presenter
    pub fn frame_into(&mut self, presenter: &mut dyn Presenter) -> std::result::Result<(), RenderError> {
        self.render_loop.tick(&mut self.session, presenter)
    }

    /// Advance one frame and return what to draw, for hosts that render themselves
    pub fn advance_frame(&mut self) -> (SceneSnapshot, Camera) {
        let scene = self.render_loop.advance(&mut self.session);
        (scene, self.session.camera.clone())
    }

    /// Frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.render_loop.frames()
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Export in the given format
    #[cfg(not(target_arch = "wasm32"))]
    pub fn export(&mut self, kind: ExportKind) -> Result<Artifact> {
        match kind {
            ExportKind::Svg => Ok(self.export_svg()),
            ExportKind::Png => self.export_png(),
            ExportKind::Glb => self.export_glb(),
        }
    }

    pub fn export_svg(&self) -> Artifact {
        exporter::export_svg(&self.session)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn export_png(&mut self) -> Result<Artifact> {
        let gpu = self.ensure_gpu().map_err(|e| Error::Export(e.to_string()))?;
        exporter::export_png(&self.session, &gpu)
    }

    /// The print render as a job to run on any device
    pub fn print_job(&self) -> PrintJob {
        PrintJob::new(&self.session)
    }

    pub fn export_glb(&self) -> Result<Artifact> {
        exporter::export_glb(&self.session)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
