//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::atlas::SpriteAtlas;
use crate::generator::{
    FeedbackSink, GenerationContext, Generator, GeneratorResources,
};
use crate::glint::GlintEngine;
use crate::overlay::{self, OverlayRegistry};
use crate::request::{
    ItemSpriteRequest, PlayerHeadRequest, RecipeRequest, TooltipRequest,
};
use crate::settings::RenderSettings;
use crate::skin::MojangSkinSource;

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// itemforge - Render Minecraft-style tooltips, item sprites, recipe grids
/// and player heads
#[derive(Parser)]
#[command(name = "itemforge")]
#[command(about = "Render Minecraft-style tooltips, item sprites, recipe grids and player heads")]
#[command(version)]
pub struct Cli {
    /// Sprite atlas image (required for sprite and recipe commands)
    #[arg(long, global = true)]
    pub atlas_image: Option<PathBuf>,

    /// Sprite atlas coordinate table, JSON
    #[arg(long, global = true)]
    pub atlas_table: Option<PathBuf>,

    /// Overlay definition table, JSON
    #[arg(long, global = true)]
    pub overlay_table: Option<PathBuf>,

    /// Enchantment glint texture image
    #[arg(long, global = true)]
    pub glint_texture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a tooltip panel from markup text
    Tooltip {
        /// Markup text, %%TAG%% and &-code syntax
        text: String,

        /// Output file. Defaults to tooltip.png (or .gif when animated)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap width in visible characters
        #[arg(long, default_value = "38")]
        line_length: usize,

        /// Background opacity, 0-255
        #[arg(long, default_value = "245")]
        alpha: u8,

        /// Extra vertical pixels after the first line
        #[arg(long, default_value = "0")]
        padding: u32,

        /// Skip the border ring
        #[arg(long)]
        no_border: bool,

        /// Center each line
        #[arg(long)]
        center: bool,

        /// Integer upscale factor
        #[arg(long, default_value = "1")]
        scale: u32,
    },

    /// Render a single item sprite with effects
    Sprite {
        /// Item name in the atlas
        item: String,

        /// Output file. Defaults to {item}.png (or .gif when animated)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overlay color option: named color, hex list, or empty
        #[arg(long)]
        color: Option<String>,

        /// Apply the enchantment glint
        #[arg(long)]
        enchanted: bool,

        /// Apply the hover highlight
        #[arg(long)]
        hovered: bool,

        /// Durability percent remaining, 0-99 draws the bar
        #[arg(long)]
        durability: Option<u8>,

        /// Integer upscale factor
        #[arg(long, default_value = "16")]
        scale: u32,
    },

    /// Render a 3x3 crafting grid from a recipe string
    Recipe {
        /// Recipe, `slot,amount,material[,data]` segments joined by %%
        recipe: String,

        /// Output file. Defaults to recipe.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Label drawn above the grid
        #[arg(long)]
        title: Option<String>,

        /// Integer upscale factor
        #[arg(long, default_value = "2")]
        scale: u32,
    },

    /// Render a player head from a name, texture hash, url or profile blob
    Head {
        /// Player name, 64-hex texture hash, texture url or base64 blob
        texture: String,

        /// Output file. Defaults to head.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Integer upscale factor
        #[arg(long, default_value = "8")]
        scale: u32,
    },
}

/// Prints failures straight to stderr. The exit code already distinguishes
/// user errors from service errors, so the flag is unused here.
struct StderrSink;

impl FeedbackSink for StderrSink {
    fn send_message(&self, text: &str, _is_user_error: bool) {
        eprintln!("Error: {text}");
    }
}

/// Run the CLI application
pub fn run() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let resources = match load_resources(&cli) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let generator = match Generator::new(resources) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // The sink prints the failure, so error paths below stay quiet
    let ctx = GenerationContext::new("cli", Arc::new(StderrSink));

    let (result, output) = match cli.command {
        Commands::Tooltip {
            text,
            output,
            line_length,
            alpha,
            padding,
            no_border,
            center,
            scale,
        } => {
            let mut request = TooltipRequest::new(text);
            request.settings =
                RenderSettings::new(line_length, alpha, padding, !no_border, center, scale);
            (generator.build_tooltip(&request, &ctx), output)
        }
        Commands::Sprite {
            item,
            output,
            color,
            enchanted,
            hovered,
            durability,
            scale,
        } => {
            let mut request = ItemSpriteRequest::new(&item);
            request.color_option = color;
            request.enchanted = enchanted;
            request.hovered = hovered;
            request.durability = durability;
            request.scale = scale;
            let output = output.or_else(|| Some(PathBuf::from(format!("{item}.png"))));
            (generator.build_item_sprite(&request, &ctx), output)
        }
        Commands::Recipe { recipe, output, title, scale } => {
            let mut request = RecipeRequest::new(recipe);
            request.title = title;
            request.scale = scale;
            let output = output.or_else(|| Some(PathBuf::from("recipe.png")));
            (generator.build_recipe_grid(&request, &ctx), output)
        }
        Commands::Head { texture, output, scale } => {
            let mut request = PlayerHeadRequest::new(texture);
            request.scale = scale;
            let output = output.or_else(|| Some(PathBuf::from("head.png")));
            (generator.build_player_head(&request, &ctx), output)
        }
    };

    let object = match result {
        Ok(object) => object,
        // The sink already printed the message
        Err(_) => return ExitCode::from(EXIT_ERROR),
    };

    let path = output
        .unwrap_or_else(|| PathBuf::from("tooltip.png"))
        .with_extension(object.encoded.extension);
    if let Err(e) = fs::write(&path, &object.encoded.bytes) {
        eprintln!("Error: Cannot write '{}': {}", path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Wrote {}", path.display());
    ExitCode::from(EXIT_SUCCESS)
}

/// Load whatever resources the flags name. A product with missing resources
/// stays disabled; the generator refuses its requests with a clear message.
fn load_resources(cli: &Cli) -> Result<GeneratorResources, String> {
    let atlas = match (&cli.atlas_image, &cli.atlas_table) {
        (Some(image), Some(table)) => Some(Arc::new(
            SpriteAtlas::load(image, table).map_err(|e| e.to_string())?,
        )),
        (None, None) => None,
        _ => return Err("--atlas-image and --atlas-table must be given together".to_string()),
    };

    let overlays = match (&cli.overlay_table, &atlas) {
        (Some(table), Some(atlas)) => {
            let text = read_text(table)?;
            Arc::new(overlay::load_registry(&text, atlas).map_err(|e| e.to_string())?)
        }
        (Some(_), None) => {
            return Err("--overlay-table needs the atlas flags to crop overlay art".to_string())
        }
        (None, _) => Arc::new(OverlayRegistry::new()),
    };

    let glint = match &cli.glint_texture {
        Some(path) => {
            let texture = image::open(path)
                .map_err(|e| format!("cannot open glint texture '{}': {e}", path.display()))?
                .to_rgba8();
            Some(Arc::new(GlintEngine::new(texture)))
        }
        None => None,
    };

    Ok(GeneratorResources {
        atlas,
        overlays,
        glint,
        skins: Arc::new(MojangSkinSource),
    })
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {e}", path.display()))
}
