//! Export artifacts
//!
//! Three formats are produced: a millimeter-accurate SVG drawing, a PNG
//! print render and a binary glTF asset. Rendering the PNG needs a
//! renderer, so this module only provides its encoding and sizing; the
//! other two are built here directly.

mod glb;
mod svg_doc;

use crate::component::ComponentId;
use crate::{Error, Result};
use glam::{UVec2, Vec2};
use image::RgbaImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub use glb::{GlbOptions, write_glb};
pub use svg_doc::{build_svg_document, scene_to_document_mm};

/// Base name shared by all artifacts
pub const ARTIFACT_STEM: &str = "cloud-card";

const MM_PER_INCH: f32 = 25.4;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Svg,
    Png,
    Glb,
}

impl ExportKind {
    pub fn all() -> [Self; 3] {
        [Self::Svg, Self::Png, Self::Glb]
    }

    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Glb => "glb",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Glb => "model/gltf-binary",
        }
    }

    /// Fixed download name, e.g. `cloud-card.png`
    pub fn file_name(&self) -> String {
        format!("{}.{}", ARTIFACT_STEM, self.extension())
    }
}

/// A finished export
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ExportKind,
    pub bytes: Vec<u8>,
    /// Components left out because their content could not be processed
    pub skipped: Vec<ComponentId>,
}

impl Artifact {
    pub fn new(kind: ExportKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            bytes,
            skipped: Vec::new(),
        }
    }

    pub fn file_name(&self) -> String {
        self.kind.file_name()
    }

    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }

    /// Write the artifact into `dir` under its fixed name
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        self.write_to(&path)?;
        Ok(path)
    }

    /// Write the artifact to an explicit path
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        tracing::info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }
}

/// Pixel size of a print render of `size_mm` at `dpi`, truncated to whole pixels
pub fn print_size_px(size_mm: Vec2, dpi: f32) -> UVec2 {
    let px = (size_mm / MM_PER_INCH * dpi).floor().max(Vec2::ONE);
    UVec2::new(px.x as u32, px.y as u32)
}

/// Encode an RGBA image as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Export("cannot encode an empty image".to_string()));
    }
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
