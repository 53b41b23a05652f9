//! Editor configuration
//!
//! Every tunable constant of the editor lives here. Configuration files are
//! JSON; missing fields fall back to the defaults below, so a file only
//! needs to name what it changes.

use crate::color::Rgb;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub card: CardConfig,
    pub interaction: InteractionConfig,
    pub text: TextConfig,
    pub graphic: GraphicConfig,
    pub render: RenderConfig,
    pub export: ExportConfig,
}

/// Physical card dimensions in millimeters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub width_mm: f32,
    pub height_mm: f32,
    pub thickness_mm: f32,
    pub corner_radius_mm: f32,
    /// Bevelled edges (the richer card variant); `None` gives flat sides
    pub bevel: Option<BevelConfig>,
}

impl Default for CardConfig {
    fn default() -> Self {
        // ISO/IEC 7810 ID-1
        Self {
            width_mm: 85.6,
            height_mm: 53.98,
            thickness_mm: 0.76,
            corner_radius_mm: 3.13,
            bevel: None,
        }
    }
}

/// Symmetric bevel, expressed relative to the card thickness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BevelConfig {
    pub thickness_ratio: f32,
    pub size_ratio: f32,
    pub segments: u32,
}

impl Default for BevelConfig {
    fn default() -> Self {
        Self {
            thickness_ratio: 0.5,
            size_ratio: 0.5,
            segments: 5,
        }
    }
}

/// Drag, nudge and wheel-scale behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Nudge distance in scene units
    pub move_step: f32,
    /// Uniform scale change per wheel tick
    pub scale_step: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Imported graphics never fill more than this share of the card
    pub fit_factor: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            move_step: 0.1,
            scale_step: 0.05,
            min_scale: 0.1,
            max_scale: 5.0,
            fit_factor: 0.8,
        }
    }
}

/// Text component defaults and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub default_font_size: u32,
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub default_font_family: String,
    /// Families offered by the edit panel
    pub font_families: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            default_font_size: 24,
            min_font_size: 8,
            max_font_size: 72,
            default_font_family: "Arial".to_string(),
            font_families: vec![
                "Arial".to_string(),
                "Times New Roman".to_string(),
                "Courier New".to_string(),
            ],
        }
    }
}

/// Vector graphic defaults and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicConfig {
    pub default_size_percent: u32,
    pub min_size_percent: u32,
    pub max_size_percent: u32,
}

impl Default for GraphicConfig {
    fn default() -> Self {
        Self {
            default_size_percent: 100,
            min_size_percent: 10,
            max_size_percent: 500,
        }
    }
}

/// Interactive view settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub camera_distance: f32,
    /// Card rotation per frame while auto-rotate is on (radians)
    pub auto_rotate_speed: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            camera_distance: 8.0,
            auto_rotate_speed: 0.01,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 3.0,
            max_distance: 15.0,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Raster export resolution
    pub dpi: f32,
    /// Color substituted for every fill and stroke of imported vectors
    pub accent_color: Rgb,
    /// Largest texture edge written into 3D assets
    pub max_texture_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dpi: 300.0,
            accent_color: Rgb::SILVER,
            max_texture_size: 4096,
        }
    }
}

impl EditorConfig {
    /// Reject values the editor cannot work with
    ///
    /// Bounds must be ordered and steps, factors and sizes positive, since
    /// every clamp in the editor relies on them.
    pub fn validate(&self) -> Result<()> {
        let card = &self.card;
        positive("card.width_mm", card.width_mm)?;
        positive("card.height_mm", card.height_mm)?;
        positive("card.thickness_mm", card.thickness_mm)?;
        if !card.corner_radius_mm.is_finite() || card.corner_radius_mm < 0.0 {
            return Err(invalid("card.corner_radius_mm must be zero or positive"));
        }

        let interaction = &self.interaction;
        positive("interaction.move_step", interaction.move_step)?;
        positive("interaction.scale_step", interaction.scale_step)?;
        positive("interaction.min_scale", interaction.min_scale)?;
        positive("interaction.max_scale", interaction.max_scale)?;
        positive("interaction.fit_factor", interaction.fit_factor)?;
        ordered("interaction scale", interaction.min_scale, interaction.max_scale)?;

        let text = &self.text;
        if text.min_font_size == 0 {
            return Err(invalid("text.min_font_size must be at least 1"));
        }
        ordered("text font size", text.min_font_size, text.max_font_size)?;

        let graphic = &self.graphic;
        if graphic.min_size_percent == 0 {
            return Err(invalid("graphic.min_size_percent must be at least 1"));
        }
        ordered("graphic size percent", graphic.min_size_percent, graphic.max_size_percent)?;

        let render = &self.render;
        positive("render.fov_degrees", render.fov_degrees)?;
        positive("render.min_distance", render.min_distance)?;
        positive("render.max_distance", render.max_distance)?;
        ordered("render camera distance", render.min_distance, render.max_distance)?;

        positive("export.dpi", self.export.dpi)?;
        if self.export.max_texture_size == 0 {
            return Err(invalid("export.max_texture_size must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidInput(message.into())
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be positive, got {}", name, value)))
    }
}

fn ordered<T: PartialOrd + std::fmt::Display>(name: &str, min: T, max: T) -> Result<()> {
    if min <= max {
        Ok(())
    } else {
        Err(invalid(format!("{} minimum {} exceeds maximum {}", name, min, max)))
    }
}

/// Parse a configuration file
pub fn load_config(path: &Path) -> Result<EditorConfig> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration JSON
pub fn parse_config(json: &str) -> Result<EditorConfig> {
    let config: EditorConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, returning defaults if the file is missing or invalid
pub fn load_config_or_default(path: &Path) -> EditorConfig {
    if !path.exists() {
        return EditorConfig::default();
    }

    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring config {}: {}", path.display(), e);
            EditorConfig::default()
        }
    }
}

/// Serialize configuration as pretty JSON
pub fn config_to_json(config: &EditorConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(r#"{ "interaction": { "move_step": 0.25 } }"#)
            .expect("partial config should parse");

        assert!((config.interaction.move_step - 0.25).abs() < f32::EPSILON);
        assert!((config.interaction.max_scale - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.card, CardConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = EditorConfig::default();
        config.card.bevel = Some(BevelConfig::default());
        config.export.accent_color = Rgb::new(0xE8, 0xE8, 0xE8);

        let json = config_to_json(&config).expect("serialize");
        let parsed = parse_config(&json).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_scale_bounds() {
        let result = parse_config(r#"{ "interaction": { "min_scale": 6.0, "max_scale": 2.0 } }"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let font = parse_config(r#"{ "text": { "min_font_size": 80 } }"#);
        assert!(matches!(font, Err(Error::InvalidInput(_))));

        let percent = parse_config(r#"{ "graphic": { "min_size_percent": 600 } }"#);
        assert!(matches!(percent, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_non_positive_values() {
        for json in [
            r#"{ "interaction": { "fit_factor": 0.0 } }"#,
            r#"{ "interaction": { "scale_step": -0.05 } }"#,
            r#"{ "export": { "dpi": 0.0 } }"#,
            r#"{ "card": { "width_mm": -85.6 } }"#,
            r#"{ "export": { "max_texture_size": 0 } }"#,
        ] {
            assert!(matches!(parse_config(json), Err(Error::InvalidInput(_))), "{}", json);
        }
    }

    #[test]
    fn test_rejects_nan() {
        let mut config = EditorConfig::default();
        config.interaction.max_scale = f32::NAN;
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("cloudcard_inverted_config.json");
        std::fs::write(&path, r#"{ "interaction": { "min_scale": 9.0 } }"#).expect("write");
        assert!(load_config(&path).is_err());
        assert_eq!(load_config_or_default(&path), EditorConfig::default());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("cloudcard_missing_config.json");
        std::fs::remove_file(&path).ok();
        assert_eq!(load_config_or_default(&path), EditorConfig::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let path = std::env::temp_dir().join("cloudcard_invalid_config.json");
        std::fs::write(&path, "{ not json").expect("write temp file");
        assert_eq!(load_config_or_default(&path), EditorConfig::default());
        std::fs::remove_file(&path).ok();
    }
}
