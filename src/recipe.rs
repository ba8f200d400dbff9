//! Recipe parsing and crafting-grid rendering
//!
//! The recipe string lists items separated by `%%`, each item being
//! `slot,amount,material[,data]`. Slots are 1-based across a 3x3 grid.
//! Malformed items are rejected outright with the offending fragment; no
//! clamping or best-effort repair.

use crate::atlas::{scale_to_fit, AtlasError, SpriteAtlas};
use crate::chat::Style;
use crate::font;
use crate::overlay::composite_over;
use image::{Rgba, RgbaImage};
use thiserror::Error;

pub const GRID_COLUMNS: u32 = 3;
pub const GRID_ROWS: u32 = 3;
pub const SLOT_COUNT: u32 = GRID_COLUMNS * GRID_ROWS;

pub const MIN_AMOUNT: u32 = 1;
pub const MAX_AMOUNT: u32 = 64;

/// Slot interior in texels; the classic inventory slot is 18 texels with a
/// one-texel bevel on each side.
const SLOT_TEXELS: u32 = 18;
const SLOT_INNER: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    #[error("recipe item `{0}` needs slot,amount,material")]
    MissingField(String),
    #[error("recipe slot `{0}` is not a number")]
    NonIntegerSlot(String),
    #[error("recipe amount `{0}` is not a number")]
    NonIntegerAmount(String),
    #[error("recipe amount {0} is outside {MIN_AMOUNT}-{MAX_AMOUNT}")]
    AmountOutOfRange(u64),
    #[error("recipe slot {0} is outside the {GRID_COLUMNS}x{GRID_ROWS} grid")]
    SlotOutOfRange(u32),
    #[error("recipe slot {0} is used twice")]
    DuplicateSlot(u32),
}

/// One placed ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeItem {
    /// 1-based slot index, row-major across the grid.
    pub slot: u32,
    pub amount: u32,
    pub material: String,
    /// Free-form extra data forwarded to the sprite lookup (skull hashes,
    /// overlay color options).
    pub data: Option<String>,
}

/// Parse the full recipe string. Each invalid item aborts the parse.
pub fn parse_recipe(input: &str) -> Result<Vec<RecipeItem>, RecipeError> {
    let mut items = Vec::new();
    let mut used = std::collections::HashSet::new();

    for raw in input.split("%%") {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let item = parse_item(raw)?;
        if !used.insert(item.slot) {
            return Err(RecipeError::DuplicateSlot(item.slot));
        }
        items.push(item);
    }

    Ok(items)
}

fn parse_item(raw: &str) -> Result<RecipeItem, RecipeError> {
    let mut fields = raw.splitn(4, ',').map(str::trim);
    let (Some(slot), Some(amount), Some(material)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(RecipeError::MissingField(raw.to_string()));
    };
    if material.is_empty() {
        return Err(RecipeError::MissingField(raw.to_string()));
    }

    let slot: u32 = slot
        .parse()
        .map_err(|_| RecipeError::NonIntegerSlot(slot.to_string()))?;
    // Parse wide so overflowing amounts report as out of range, not as
    // non-numeric
    let amount: u64 = amount.parse().map_err(|e: std::num::ParseIntError| match e.kind() {
        std::num::IntErrorKind::PosOverflow => RecipeError::AmountOutOfRange(u64::MAX),
        _ => RecipeError::NonIntegerAmount(amount.to_string()),
    })?;

    if !(MIN_AMOUNT as u64..=MAX_AMOUNT as u64).contains(&amount) {
        return Err(RecipeError::AmountOutOfRange(amount));
    }
    let amount = amount as u32;
    if !(1..=SLOT_COUNT).contains(&slot) {
        return Err(RecipeError::SlotOutOfRange(slot));
    }

    Ok(RecipeItem {
        slot,
        amount,
        material: material.to_string(),
        data: fields.next().map(|d| d.to_string()),
    })
}

/// Panel and slot colors, matching the classic inventory texture.
const PANEL_RGB: [u8; 3] = [198, 198, 198];
const SLOT_INTERIOR_RGB: [u8; 3] = [139, 139, 139];
const SLOT_SHADOW_RGB: [u8; 3] = [55, 55, 55];
const SLOT_HIGHLIGHT_RGB: [u8; 3] = [255, 255, 255];

/// Render the ingredient grid. `render_sprite` resolves one item to its
/// sprite so the caller controls atlas lookup, recoloring and head fetches.
pub fn render_grid<E>(
    items: &[RecipeItem],
    scale: u32,
    mut render_sprite: impl FnMut(&RecipeItem) -> Result<RgbaImage, E>,
) -> Result<RgbaImage, E> {
    let scale = scale.max(1);
    let slot_px = SLOT_TEXELS * scale;
    let margin = 2 * scale;
    let width = margin * 2 + slot_px * GRID_COLUMNS;
    let height = margin * 2 + slot_px * GRID_ROWS;

    let mut img = RgbaImage::from_pixel(
        width,
        height,
        Rgba([PANEL_RGB[0], PANEL_RGB[1], PANEL_RGB[2], 255]),
    );

    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLUMNS {
            draw_slot(&mut img, margin + col * slot_px, margin + row * slot_px, scale);
        }
    }

    for item in items {
        let sprite = render_sprite(item)?;
        let index = item.slot - 1;
        let (col, row) = (index % GRID_COLUMNS, index / GRID_COLUMNS);
        let inner = SLOT_INNER * scale;
        let fitted = scale_to_fit(&sprite, inner, inner);

        let slot_x = margin + col * slot_px + scale;
        let slot_y = margin + row * slot_px + scale;
        let offset_x = slot_x + (inner - fitted.width()) / 2;
        let offset_y = slot_y + (inner - fitted.height()) / 2;
        blit(&mut img, &fitted, offset_x, offset_y);

        if item.amount > 1 {
            draw_stack_count(&mut img, item.amount, slot_x, slot_y, inner, scale);
        }
    }

    Ok(img)
}

/// Title text color, the classic inventory label gray.
const TITLE_RGB: [u8; 3] = [64, 64, 64];

/// Render the grid with an optional title band above it.
pub fn render_grid_titled<E>(
    items: &[RecipeItem],
    scale: u32,
    title: Option<&str>,
    render_sprite: impl FnMut(&RecipeItem) -> Result<RgbaImage, E>,
) -> Result<RgbaImage, E> {
    let scale = scale.max(1);
    let grid = render_grid(items, scale, render_sprite)?;
    let Some(title) = title.filter(|t| !t.is_empty()) else {
        return Ok(grid);
    };

    let band = (font::GLYPH_HEIGHT + 4) * scale;
    let mut img = RgbaImage::from_pixel(
        grid.width(),
        grid.height() + band,
        Rgba([PANEL_RGB[0], PANEL_RGB[1], PANEL_RGB[2], 255]),
    );
    let style = Style::default();
    let mut x = 2 * scale;
    let y = 2 * scale;
    for c in title.chars() {
        if x + 8 * scale > img.width() {
            break;
        }
        // shadow in panel color so the label reads flat, like the classic ui
        x += font::draw_char(&mut img, c, x, y, TITLE_RGB, PANEL_RGB, &style, scale);
    }
    blit(&mut img, &grid, 0, band);
    Ok(img)
}

/// Convenience wrapper resolving sprites straight from an atlas.
pub fn render_grid_from_atlas(
    items: &[RecipeItem],
    atlas: &SpriteAtlas,
    scale: u32,
) -> Result<RgbaImage, AtlasError> {
    render_grid(items, scale, |item| atlas.sprite(&item.material))
}

/// The three-tone bevel: shadow along top and left, highlight along bottom
/// and right, flat interior.
fn draw_slot(img: &mut RgbaImage, x: u32, y: u32, scale: u32) {
    let size = SLOT_TEXELS * scale;
    fill(img, x, y, size, size, SLOT_INTERIOR_RGB);
    fill(img, x, y, size, scale, SLOT_SHADOW_RGB);
    fill(img, x, y, scale, size, SLOT_SHADOW_RGB);
    fill(img, x, y + size - scale, size, scale, SLOT_HIGHLIGHT_RGB);
    fill(img, x + size - scale, y, scale, size, SLOT_HIGHLIGHT_RGB);
}

/// Stack count in the bottom-right corner, white over shadow.
fn draw_stack_count(img: &mut RgbaImage, amount: u32, slot_x: u32, slot_y: u32, inner: u32, scale: u32) {
    let text = amount.to_string();
    let style = Style::default();
    let text_w = font::text_width(&text, &style) * scale;
    let text_h = font::GLYPH_HEIGHT * scale;
    let mut x = (slot_x + inner).saturating_sub(text_w);
    let y = (slot_y + inner).saturating_sub(text_h);
    for c in text.chars() {
        x += font::draw_char(img, c, x, y, [255, 255, 255], [63, 63, 63], &style, scale);
    }
}

fn fill(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
    let color = Rgba([rgb[0], rgb[1], rgb[2], 255]);
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

fn blit(base: &mut RgbaImage, top: &RgbaImage, x: u32, y: u32) {
    let mut shifted = RgbaImage::new(base.width(), base.height());
    for (sx, sy, px) in top.enumerate_pixels() {
        let (tx, ty) = (x + sx, y + sy);
        if tx < shifted.width() && ty < shifted.height() {
            shifted.put_pixel(tx, ty, *px);
        }
    }
    composite_over(base, &shifted);
}
