//! cloudcard CLI - compose, render and export cards from the command line

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use cloudcard_core::card::UNITS_PER_MM;
use cloudcard_core::component::ComponentId;
use cloudcard_core::config::config_to_json;
use cloudcard_core::export::encode_png;
use cloudcard_engine::{
    CardColor, Editor, EditorConfig, ExportKind, load_config, load_config_or_default,
};
use glam::Vec2;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudcard")]
#[command(about = "Compose text and vector art onto a 3D card and export it", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to {config_dir}/cloudcard/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a card and export it (format from each output's extension)
    Compose {
        #[command(flatten)]
        card: CardArgs,

        /// Output files (.svg, .png or .glb)
        #[arg(short, long, required = true)]
        output: Vec<PathBuf>,

        /// Print the component list as JSON
        #[arg(long)]
        list: bool,
    },

    /// Render frames of the editor view (headless)
    Render {
        #[command(flatten)]
        card: CardArgs,

        /// Output image file (.png); with several frames, a number is appended
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Number of frames to run through the render loop
        #[arg(long, default_value = "1")]
        frames: u32,

        /// Frame width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "720")]
        height: u32,

        /// Spin the card while rendering
        #[arg(long)]
        auto_rotate: bool,

        /// Solid green background
        #[arg(long)]
        greenscreen: bool,
    },

    /// Write the default configuration
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Card content shared by `compose` and `render`
#[derive(Args)]
struct CardArgs {
    /// Text line, optionally placed: "JANE DOE@-20,-18" (mm from the card center, y up)
    #[arg(short, long)]
    text: Vec<String>,

    /// SVG file, optionally placed: "logo.svg@25,12"
    #[arg(short, long)]
    svg: Vec<String>,

    /// Card color (black, red, green, gold, blue)
    #[arg(short, long, default_value = "black")]
    color: String,

    /// Font size for text lines in pixels
    #[arg(long)]
    font_size: Option<u32>,

    /// Font family for text lines
    #[arg(long)]
    font: Option<String>,

    /// Extra font file (.ttf/.otf) to make available
    #[arg(long)]
    font_file: Vec<PathBuf>,

    /// Size of SVG graphics in percent of the fitted size
    #[arg(long)]
    svg_size: Option<u32>,

    /// Uniform scale applied to every component
    #[arg(long)]
    scale: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compose { card, output, list } => {
            let config = resolve_config(cli.config.as_deref())?;
            run_compose(config, &card, &output, list)?;
        }
        Commands::Render {
            card,
            output,
            frames,
            width,
            height,
            auto_rotate,
            greenscreen,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            let options = RenderOptions {
                frames,
                width,
                height,
                auto_rotate,
                greenscreen,
            };
            run_render(config, &card, &output, &options)?;
        }
        Commands::InitConfig { force } => {
            let path = cli
                .config
                .or_else(default_config_path)
                .context("No configuration directory on this system; pass --config")?;
            init_config(&path, force)?;
        }
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cloudcard").join("config.json"))
}

/// An explicit `--config` must load; the default location is optional
fn resolve_config(explicit: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = explicit {
        tracing::debug!("Loading config from {}", path.display());
        return load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    Ok(default_config_path()
        .map(|path| load_config_or_default(&path))
        .unwrap_or_default())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = config_to_json(&EditorConfig::default())?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_compose(config: EditorConfig, card: &CardArgs, outputs: &[PathBuf], list: bool) -> Result<()> {
    // Reject unknown extensions before doing any work
    let kinds = outputs
        .iter()
        .map(|path| {
            ExportKind::from_extension(path)
                .with_context(|| format!("Unknown export format for {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut editor = build_editor(config, card)?;

    if list {
        println!("{}", serde_json::to_string_pretty(&editor.components())?);
    }

    for (path, kind) in outputs.iter().zip(kinds) {
        let artifact = editor
            .export(kind)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        for id in &artifact.skipped {
            eprintln!("Warning: component {} left out of {}", id, path.display());
        }
        artifact.write_to(path)?;
        println!("Exported to: {}", path.display());
    }

    Ok(())
}

struct RenderOptions {
    frames: u32,
    width: u32,
    height: u32,
    auto_rotate: bool,
    greenscreen: bool,
}

fn run_render(config: EditorConfig, card: &CardArgs, output: &Path, options: &RenderOptions) -> Result<()> {
    if options.frames == 0 {
        bail!("--frames must be at least 1");
    }

    let mut editor = build_editor(config, card)?;
    editor.resize(options.width, options.height);
    if options.auto_rotate {
        editor.toggle_auto_rotate();
    }
    if options.greenscreen {
        editor.toggle_greenscreen();
    }

    println!(
        "Rendering {} frame(s) to {} ({}x{})...",
        options.frames,
        output.display(),
        options.width,
        options.height
    );

    for index in 0..options.frames {
        let frame = editor.frame().context("Failed to render frame")?;
        let path = if options.frames == 1 {
            output.to_path_buf()
        } else {
            numbered_path(output, index)
        };
        std::fs::write(&path, encode_png(frame)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!("Rendered {} frame(s)", editor.frame_count());
    Ok(())
}

/// Create an editor and apply the card arguments to it
fn build_editor(config: EditorConfig, args: &CardArgs) -> Result<Editor> {
    let color = CardColor::from_name(&args.color).with_context(|| {
        let names: Vec<_> = CardColor::all().iter().map(|c| c.name()).collect();
        format!("Unknown color '{}' (expected one of {})", args.color, names.join(", "))
    })?;

    let font_size = args.font_size.unwrap_or(config.text.default_font_size);
    let font = args
        .font
        .clone()
        .unwrap_or_else(|| config.text.default_font_family.clone());
    let svg_size = args
        .svg_size
        .unwrap_or(config.graphic.default_size_percent);

    let mut editor = Editor::new(config);
    editor.set_card_color(color);

    for path in &args.font_file {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        editor.load_font(data);
    }

    for spec in &args.text {
        let (content, at) = parse_placed(spec)?;
        let id = editor
            .add_text(content, font_size, &font)
            .with_context(|| format!("Failed to add text '{}'", content))?;
        arrange(&mut editor, id, at, args.scale)?;
    }

    for spec in &args.svg {
        let (file, at) = parse_placed(spec)?;
        let path = Path::new(file);
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| file.to_string(), |n| n.to_string_lossy().into_owned());
        let id = editor
            .add_vector_graphic(&name, &bytes, svg_size)
            .with_context(|| format!("Failed to add {}", path.display()))?;
        arrange(&mut editor, id, at, args.scale)?;
    }

    Ok(editor)
}

/// Apply the optional scale, then the optional position (mm to scene units)
fn arrange(editor: &mut Editor, id: ComponentId, at: Option<Vec2>, scale: Option<f32>) -> Result<()> {
    if let Some(scale) = scale {
        if !editor.set_scale(id, scale)? {
            eprintln!("Warning: scale {} does not fit {} on the card", scale, id);
        }
    }
    if let Some(at) = at {
        let placed = editor.place(id, at * UNITS_PER_MM)?;
        if placed != at * UNITS_PER_MM {
            eprintln!(
                "Warning: {} moved to ({:.1}, {:.1}) mm to stay on the card",
                id,
                placed.x / UNITS_PER_MM,
                placed.y / UNITS_PER_MM
            );
        }
    }
    Ok(())
}

/// Split "VALUE@X,Y" into the value and an optional position in millimeters
fn parse_placed(spec: &str) -> Result<(&str, Option<Vec2>)> {
    let Some((value, coords)) = spec.rsplit_once('@') else {
        return Ok((spec, None));
    };
    let Some((x, y)) = coords.split_once(',') else {
        return Ok((spec, None));
    };
    match (x.trim().parse::<f32>(), y.trim().parse::<f32>()) {
        (Ok(x), Ok(y)) => Ok((value, Some(Vec2::new(x, y)))),
        _ => bail!("Invalid position '{}' in '{}' (expected X,Y in mm)", coords, spec),
    }
}

fn numbered_path(output: &Path, index: u32) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "frame".into(), |s| s.to_string_lossy().into_owned());
    let ext = output
        .extension()
        .map_or_else(|| "png".into(), |e| e.to_string_lossy().into_owned());
    output.with_file_name(format!("{}_{:04}.{}", stem, index, ext))
}
