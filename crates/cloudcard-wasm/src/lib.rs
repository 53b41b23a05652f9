//! cloudcard WASM - WebAssembly bindings for the in-browser card editor
//!
//! [`WebEditor`] wraps the engine's editor for a page script: every control
//! of the editor panel is a method, pointer and wheel events are forwarded
//! in canvas pixels, and `frame()` resolves to RGBA pixels ready for
//! `ImageData`. Exports return the file contents; downloading them is up to
//! the page.
//!
//! Rendering needs a GPU device, which the browser hands out
//! asynchronously: await `init_gpu()` once before the first `frame()` or
//! `export_png()`.

use cloudcard_core::component::ComponentId;
use cloudcard_core::config::{config_to_json, parse_config};
use cloudcard_core::registry::{TextChanges, UploadOutcome, UploadTicket};
use cloudcard_engine::{CardColor, Direction, Editor, EditorConfig, GpuDevice, GpuRenderer, Mode};
use glam::Vec2;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys::{Promise, Uint8Array};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// The card editor, as seen from JavaScript
///
/// Component ids are plain numbers on this side.
#[wasm_bindgen]
pub struct WebEditor {
    editor: Editor,
    uploads: HashMap<u32, UploadTicket>,
    gpu: Rc<RefCell<Option<GpuDevice>>>,
    /// Empty while a frame is being drawn
    renderer: Rc<RefCell<Option<GpuRenderer>>>,
    rendering: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl WebEditor {
    /// Create an editor, optionally from a JSON configuration
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebEditor, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) if !json.trim().is_empty() => parse_config(json).map_err(js_error)?,
            _ => EditorConfig::default(),
        };
        Ok(Self {
            editor: Editor::new(config),
            uploads: HashMap::new(),
            gpu: Rc::new(RefCell::new(None)),
            renderer: Rc::new(RefCell::new(None)),
            rendering: Rc::new(Cell::new(false)),
        })
    }

    /// Request a GPU device; resolves once frames and PNG export are available
    pub fn init_gpu(&self) -> Promise {
        let slot = Rc::clone(&self.gpu);
        future_to_promise(async move {
            let gpu = GpuDevice::headless().await.map_err(js_error)?;
            tracing::info!("GPU device ready");
            *slot.borrow_mut() = Some(gpu);
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn gpu_ready(&self) -> bool {
        self.gpu.borrow().is_some()
    }

    fn device(&self) -> Result<GpuDevice, JsValue> {
        self.gpu
            .borrow()
            .clone()
            .ok_or_else(|| JsValue::from_str("GPU not initialized; await init_gpu() first"))
    }

    /// Effective configuration as JSON
    pub fn config_json(&self) -> Result<String, JsValue> {
        config_to_json(self.editor.config()).map_err(js_error)
    }

    /// Make a font available to text components (the browser has no system fonts)
    pub fn load_font(&mut self, data: Vec<u8>) {
        self.editor.load_font(data);
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_text(&mut self, content: &str, font_size: u32, font_family: &str) -> Result<u32, JsValue> {
        let id = self
            .editor
            .add_text(content, font_size, font_family)
            .map_err(js_error)?;
        Ok(id.0)
    }

    /// Edit a text component; omitted fields keep their value
    pub fn update_text(
        &mut self,
        id: u32,
        content: Option<String>,
        font_size: Option<u32>,
        font_family: Option<String>,
    ) -> Result<(), JsValue> {
        let changes = TextChanges {
            content,
            font_size,
            font_family,
        };
        self.editor
            .update_text(ComponentId(id), changes)
            .map_err(js_error)
    }

    pub fn update_graphic_size(&mut self, id: u32, size_percent: u32) -> Result<(), JsValue> {
        self.editor
            .update_graphic_size(ComponentId(id), size_percent)
            .map_err(js_error)
    }

    /// Delete a component, or cancel an upload still being read
    pub fn remove(&mut self, id: u32) -> Result<(), JsValue> {
        self.uploads.remove(&id);
        self.editor.remove(ComponentId(id)).map_err(js_error)
    }

    pub fn set_visible(&mut self, id: u32, visible: bool) -> Result<(), JsValue> {
        self.editor
            .set_visible(ComponentId(id), visible)
            .map_err(js_error)
    }

    /// Component list (id, kind, name, selection, placement) as JSON
    pub fn components_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.editor.components()).map_err(js_error)
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Reserve an id for a file the page is about to read
    ///
    /// Call before `FileReader` starts; only SVG files are accepted.
    pub fn request_upload(&mut self, file_name: &str, mime: Option<String>) -> Result<u32, JsValue> {
        let ticket = self
            .editor
            .request_upload(file_name, mime.as_deref())
            .map_err(js_error)?;
        let id = ticket.id().0;
        self.uploads.insert(id, ticket);
        Ok(id)
    }

    /// Apply the read file; returns false if the upload was cancelled meanwhile
    pub fn complete_upload(&mut self, ticket_id: u32, bytes: &[u8], size_percent: u32) -> Result<bool, JsValue> {
        let Some(ticket) = self.uploads.remove(&ticket_id) else {
            tracing::debug!("Upload {} no longer pending", ticket_id);
            return Ok(false);
        };
        let outcome = self
            .editor
            .complete_upload(ticket, bytes, size_percent)
            .map_err(js_error)?;
        Ok(matches!(outcome, UploadOutcome::Applied(_)))
    }

    // ========================================================================
    // Selection and Input
    // ========================================================================

    pub fn select(&mut self, id: u32) -> Result<(), JsValue> {
        self.editor.select(ComponentId(id)).map_err(js_error)
    }

    pub fn selected(&self) -> Option<u32> {
        self.editor.selected().map(|id| id.0)
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    /// Pointer pressed at canvas pixel (x, y); returns the grabbed component
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<u32> {
        self.editor.pointer_down(Vec2::new(x, y)).map(|id| id.0)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> Result<(), JsValue> {
        self.editor.pointer_move(Vec2::new(x, y)).map_err(js_error)
    }

    pub fn pointer_up(&mut self) {
        self.editor.pointer_up();
    }

    /// Wheel event; returns whether anything changed
    pub fn wheel(&mut self, delta_y: f32) -> Result<bool, JsValue> {
        self.editor.wheel(delta_y).map_err(js_error)
    }

    /// Move the selection one step: "up", "down", "left" or "right"
    pub fn nudge(&mut self, direction: &str) -> Result<(), JsValue> {
        let direction: Direction = direction.parse().map_err(js_error)?;
        self.editor.nudge(direction).map_err(js_error)?;
        Ok(())
    }

    // ========================================================================
    // View
    // ========================================================================

    /// Toggle preview; returns true when preview is now on
    pub fn toggle_preview(&mut self) -> bool {
        self.editor.toggle_preview() == Mode::Preview
    }

    pub fn is_preview(&self) -> bool {
        self.editor.mode() == Mode::Preview
    }

    pub fn toggle_greenscreen(&mut self) -> bool {
        self.editor.toggle_greenscreen()
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.editor.toggle_auto_rotate()
    }

    /// Set the card color by palette name
    pub fn set_card_color(&mut self, name: &str) -> Result<(), JsValue> {
        let color = CardColor::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown card color '{}'", name)))?;
        self.editor.set_card_color(color);
        Ok(())
    }

    /// Palette as JSON: `[{"name": "black", "hex": "#000000"}, ...]`
    pub fn card_colors_json() -> String {
        let colors: Vec<_> = CardColor::all()
            .iter()
            .map(|c| serde_json::json!({ "name": c.name(), "hex": c.rgb().to_string() }))
            .collect();
        serde_json::Value::Array(colors).to_string()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.editor.resize(width, height);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Advance one frame; resolves to its RGBA pixels (width x height x 4)
    pub fn frame(&mut self) -> Result<Promise, JsValue> {
        if self.rendering.get() {
            return Err(JsValue::from_str("Previous frame is still rendering"));
        }
        let gpu = self.device()?;
        let viewport = self.editor.session().viewport();
        let mut renderer = self
            .renderer
            .borrow_mut()
            .take()
            .unwrap_or_else(|| GpuRenderer::new(&gpu, viewport.x, viewport.y));
        renderer.resize(viewport.x, viewport.y);

        let (scene, camera) = self.editor.advance_frame();
        let slot = Rc::clone(&self.renderer);
        let rendering = Rc::clone(&self.rendering);
        rendering.set(true);

        Ok(future_to_promise(async move {
            let pixels = renderer
                .render_async(&scene, &camera)
                .await
                .map(|frame| Uint8Array::from(frame.as_raw().as_slice()));
            *slot.borrow_mut() = Some(renderer);
            rendering.set(false);
            Ok(pixels.map_err(js_error)?.into())
        }))
    }

    pub fn width(&self) -> u32 {
        self.editor.session().viewport().x
    }

    pub fn height(&self) -> u32 {
        self.editor.session().viewport().y
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// SVG document text
    pub fn export_svg(&self) -> Result<String, JsValue> {
        let artifact = self.editor.export_svg();
        String::from_utf8(artifact.bytes).map_err(js_error)
    }

    /// Resolves to the PNG file bytes
    pub fn export_png(&self) -> Result<Promise, JsValue> {
        let gpu = self.device()?;
        let job = self.editor.print_job();
        Ok(future_to_promise(async move {
            let artifact = job.run(&gpu).await.map_err(js_error)?;
            Ok(Uint8Array::from(artifact.bytes.as_slice()).into())
        }))
    }

    /// GLB file bytes
    pub fn export_glb(&self) -> Result<Vec<u8>, JsValue> {
        Ok(self.editor.export_glb().map_err(js_error)?.bytes)
    }

    /// Download name for an export format ("svg", "png" or "glb")
    pub fn export_file_name(format: &str) -> Result<String, JsValue> {
        let path = std::path::Path::new("export").with_extension(format);
        cloudcard_engine::ExportKind::from_extension(&path)
            .map(|kind| kind.file_name())
            .ok_or_else(|| JsValue::from_str(&format!("Unknown export format '{}'", format)))
    }
}
