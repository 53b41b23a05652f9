//! End-to-end editor scenarios: input to session state to exported files

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use cloudcard_core::registry::UploadOutcome;
use cloudcard_core::texture::BlockRasterizer;
use cloudcard_engine::{
    CardColor, Direction, DragState, Editor, EditorConfig, Error, ExportKind, GpuDevice, Mode,
};
use glam::Vec2;

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="60"><rect x="10" y="10" width="100" height="40" fill="#ff0000" stroke="#000"/></svg>"##;

fn editor() -> Editor {
    let mut config = EditorConfig::default();
    config.render.viewport_width = 640;
    config.render.viewport_height = 480;
    Editor::with_rasterizer(config, Box::new(BlockRasterizer::default()))
}

/// Attach a headless device, or None on machines without any adapter
fn with_gpu(mut editor: Editor) -> Option<Editor> {
    match GpuDevice::headless_blocking() {
        Ok(gpu) => {
            editor.attach_gpu(gpu);
            Some(editor)
        }
        Err(e) => {
            eprintln!("skipping GPU scenario: {}", e);
            None
        }
    }
}

fn viewport_center(editor: &Editor) -> Vec2 {
    editor.session().viewport_size() / 2.0
}

#[test]
fn add_then_remove_text() {
    let mut editor = editor();
    let id = editor.add_text("HELLO", 24, "Arial").expect("add");
    assert_eq!(editor.components().len(), 1);
    assert_eq!(editor.components()[0].name, "HELLO");
    assert_eq!(editor.selected(), None);

    editor.select(id).expect("select");
    editor.remove(id).expect("remove");
    assert!(editor.components().is_empty());
    assert_eq!(editor.selected(), None);
    assert!(matches!(editor.remove(id), Err(Error::NotFound(_))));
}

#[test]
fn ids_increase_with_each_add() {
    let mut editor = editor();
    let ids: Vec<_> = (0..5)
        .map(|i| editor.add_text(&format!("LINE {}", i), 18, "Arial").expect("add"))
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let listed: Vec<_> = editor.components().iter().map(|c| c.id).collect();
    assert_eq!(listed, ids);
}

#[test]
fn preview_toggle_twice_returns_to_edit() {
    let mut editor = editor();
    assert_eq!(editor.mode(), Mode::Edit);
    assert_eq!(editor.toggle_preview(), Mode::Preview);
    assert!(editor.session().controls.enabled);
    assert_eq!(editor.toggle_preview(), Mode::Edit);
    assert!(!editor.session().controls.enabled);
}

#[test]
fn dragging_keeps_component_on_card() {
    let mut editor = editor();
    let id = editor.add_text("HELLO", 24, "Arial").expect("add");

    let center = viewport_center(&editor);
    assert_eq!(editor.pointer_down(center), Some(id));
    assert_eq!(editor.drag_state(), DragState::Dragging(id));

    let size = editor.session().viewport_size();
    for target in [Vec2::ZERO, size, Vec2::new(size.x, 0.0), Vec2::new(0.0, size.y)] {
        editor.pointer_move(target).expect("move");
        let c = editor.component(id).expect("component");
        let half = editor.session().card.dimensions().half_extents();
        let extent = c.scaled_size() / 2.0;
        assert!(c.position.x.abs() <= half.x - extent.x + 1e-5);
        assert!(c.position.y.abs() <= half.y - extent.y + 1e-5);
    }

    editor.pointer_up();
    assert_eq!(editor.drag_state(), DragState::Idle);
    assert_eq!(editor.selected(), Some(id));
}

#[test]
fn scale_respects_bounds() {
    let mut editor = editor();
    let id = editor.add_text("HI", 12, "Arial").expect("add");
    editor.select(id).expect("select");

    for _ in 0..100 {
        editor.wheel(1.0).expect("wheel");
    }
    let min = editor.config().interaction.min_scale;
    assert_relative_eq!(editor.component(id).expect("c").scale, min, epsilon = 1e-5);

    for _ in 0..100 {
        editor.wheel(-1.0).expect("wheel");
    }
    let max = editor.config().interaction.max_scale;
    assert_relative_eq!(editor.component(id).expect("c").scale, max, epsilon = 1e-5);
}

#[test]
fn nudges_move_selection() {
    let mut editor = editor();
    let id = editor.add_text("HELLO", 24, "Arial").expect("add");
    editor.select(id).expect("select");

    editor.nudge(Direction::Up).expect("nudge");
    editor.nudge(Direction::Up).expect("nudge");
    editor.nudge(Direction::Left).expect("nudge");
    let pos = editor.component(id).expect("c").position;
    assert_relative_eq!(pos.x, -0.1, epsilon = 1e-5);
    assert_relative_eq!(pos.y, 0.2, epsilon = 1e-5);
}

#[test]
fn centered_text_lands_in_document_center() {
    let mut editor = editor();
    editor.add_text("CENTER", 24, "Arial").expect("add");

    let svg = String::from_utf8(editor.export_svg().bytes).expect("utf8");
    assert!(svg.contains(r#"x="42.8""#), "{}", svg);
    assert!(svg.contains(r#"y="26.99""#), "{}", svg);
    assert!(svg.contains("CENTER"));
}

#[test]
fn all_exports_from_one_session() {
    let mut editor = editor();
    editor.set_card_color(CardColor::Gold);
    editor.add_text("JANE DOE", 24, "Arial").expect("add text");
    let logo = editor
        .add_vector_graphic("logo.svg", LOGO.as_bytes(), 50)
        .expect("add logo");
    editor.select(logo).expect("select");
    editor.nudge(Direction::Right).expect("nudge");

    let svg = editor.export(ExportKind::Svg).expect("svg");
    let text = String::from_utf8(svg.bytes.clone()).expect("utf8");
    assert!(text.contains("JANE DOE"));
    assert!(text.contains("<g transform"));
    assert!(svg.skipped.is_empty());

    let glb = editor.export(ExportKind::Glb).expect("glb");
    assert_eq!(glb.mime(), "model/gltf-binary");
    let gltf = gltf::Gltf::from_slice(&glb.bytes).expect("valid glb");
    assert_eq!(gltf.nodes().count(), 3);
    assert_eq!(gltf.images().count(), 2);

    let Some(mut editor) = with_gpu(editor) else {
        return;
    };
    let png = editor.export(ExportKind::Png).expect("png");
    let image = image::load_from_memory(&png.bytes).expect("decode").to_rgba8();
    assert_eq!(image.dimensions(), (1011, 637));
    assert_eq!(image.get_pixel(0, 0)[3], 0);
    assert_eq!(image.get_pixel(1010, 636)[3], 0);
    // The card covers the center of the frame
    assert_eq!(image.get_pixel(505, 318)[3], 255);
}

#[test]
fn cancelled_upload_adds_nothing() {
    let mut editor = editor();
    let ticket = editor
        .request_upload("logo.svg", Some("image/svg+xml"))
        .expect("request");
    editor.remove(ticket.id()).expect("cancel");

    let outcome = editor
        .complete_upload(ticket, LOGO.as_bytes(), 50)
        .expect("complete");
    assert_eq!(outcome, UploadOutcome::Cancelled);
    assert!(editor.components().is_empty());
}

#[test]
fn upload_rejects_non_svg() {
    let mut editor = editor();
    let result = editor.request_upload("photo.png", Some("image/png"));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn frames_follow_view_toggles() {
    let Some(mut editor) = with_gpu(editor()) else {
        return;
    };
    editor.add_text("HELLO", 24, "Arial").expect("add");

    let studio_corner = *editor.frame().expect("frame").get_pixel(0, 0);
    editor.toggle_greenscreen();
    let green_corner = *editor.frame().expect("frame").get_pixel(0, 0);
    assert_ne!(studio_corner, green_corner);
    assert_eq!(green_corner[1], 255);

    editor.resize(320, 200);
    assert_eq!(editor.frame().expect("frame").dimensions(), (320, 200));
    assert_eq!(editor.frame_count(), 3);
}

#[test]
fn preview_input_moves_camera_not_components() {
    let mut editor = editor();
    let id = editor.add_text("HELLO", 24, "Arial").expect("add");
    editor.toggle_preview();

    let center = viewport_center(&editor);
    assert_eq!(editor.pointer_down(center), None);
    editor.pointer_move(center + Vec2::new(80.0, 0.0)).expect("move");
    editor.pointer_up();
    editor.wheel(-1.0).expect("zoom");

    let start = editor.session().camera.position;
    for _ in 0..5 {
        editor.advance_frame();
    }
    assert!(editor.session().camera.position.distance(start) > 0.0);
    assert_eq!(editor.component(id).expect("c").position, Vec2::ZERO);
}
