//! Embedded bitmap font and styled text drawing
//!
//! An 8x8 monochrome glyph table covering printable ASCII, with a fallback
//! glyph for icon codepoints. Glyph widths are derived from the bitmaps, so
//! text measurement and obfuscation swaps stay consistent with what gets
//! drawn. All drawing works in texels scaled by the request's pixel size.

use crate::chat::Style;
use image::{Rgba, RgbaImage};

/// Height of every glyph in texels.
pub const GLYPH_HEIGHT: u32 = 8;

/// Horizontal advance gap between glyphs in texels.
pub const GLYPH_SPACING: u32 = 1;

/// One glyph as 8 bitmap rows, bit `i` of each row = column `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub rows: [u8; 8],
}

impl Glyph {
    pub fn set(&self, x: u32, y: u32) -> bool {
        x < 8 && y < 8 && (self.rows[y as usize] >> x) & 1 == 1
    }

    /// Ink width in texels: rightmost set column + 1. Blank glyphs (space)
    /// get a fixed advance.
    pub fn width(&self) -> u32 {
        let mut mask = 0u8;
        for row in self.rows {
            mask |= row;
        }
        if mask == 0 {
            return 4;
        }
        8 - mask.leading_zeros()
    }
}

/// Drawn for codepoints outside the table (stat and gemstone icons).
const FALLBACK: Glyph = Glyph { rows: [0x08, 0x1C, 0x3E, 0x7F, 0x7F, 0x3E, 0x1C, 0x08] };

/// Look up the glyph for a character. The typographic apostrophe produced by
/// markup normalization shares the ASCII apostrophe bitmap.
pub fn glyph(c: char) -> Glyph {
    let c = match c {
        '’' => '\'',
        c => c,
    };
    let index = (c as usize).wrapping_sub(0x20);
    match ASCII.get(index) {
        Some(rows) => Glyph { rows: *rows },
        None => FALLBACK,
    }
}

/// Advance of one styled character in texels. Bold redraws one texel to the
/// right, widening every glyph by one.
pub fn char_advance(c: char, style: &Style) -> u32 {
    let bold = u32::from(style.bold);
    glyph(c).width() + bold + GLYPH_SPACING
}

/// Width of a styled string in texels.
pub fn text_width(text: &str, style: &Style) -> u32 {
    text.chars().map(|c| char_advance(c, style)).sum()
}

/// Replacement pool for obfuscated segments, grouped by glyph width so the
/// line never changes length between frames.
const OBFUSCATION_POOL: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Pick a random character with the same glyph width as `c`. Characters with
/// no same-width candidate are returned unchanged.
pub fn random_same_width(c: char, seed: &mut u64) -> char {
    let width = glyph(c).width();
    let candidates: Vec<char> =
        OBFUSCATION_POOL.chars().filter(|p| glyph(*p).width() == width).collect();
    if candidates.is_empty() {
        return c;
    }
    candidates[(pseudo_random(seed) as usize) % candidates.len()]
}

/// Deterministic pseudo-random number generator for obfuscation frames.
fn pseudo_random(seed: &mut u64) -> u32 {
    *seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
    (*seed % 2147483648) as u32
}

/// Italic shear in texels for a glyph row: the top half leans right.
fn italic_shift(style: &Style, row: u32) -> u32 {
    if style.italic && row < 4 {
        1
    } else {
        0
    }
}

/// Draw one styled character at `(x, y)` (top-left, output pixels) and
/// return its advance in output pixels. Shadow first, one pixel down-right,
/// then the face on top; bold redraws both one texel to the right.
pub fn draw_char(
    img: &mut RgbaImage,
    c: char,
    x: u32,
    y: u32,
    fg: [u8; 3],
    shadow: [u8; 3],
    style: &Style,
    pixel: u32,
) -> u32 {
    let g = glyph(c);
    let advance_texels = char_advance(c, style);

    let mut stamp = |color: [u8; 3], ox: u32, oy: u32| {
        for row in 0..GLYPH_HEIGHT {
            let lean = italic_shift(style, row);
            for col in 0..8 {
                if !g.set(col, row) {
                    continue;
                }
                fill_texel(img, x + (col + lean + ox) * pixel, y + (row + oy) * pixel, pixel, color);
            }
        }
        if style.strikethrough {
            for col in 0..advance_texels.saturating_sub(GLYPH_SPACING) {
                fill_texel(img, x + (col + ox) * pixel, y + (3 + oy) * pixel, pixel, color);
            }
        }
        if style.underlined {
            for col in 0..advance_texels {
                fill_texel(img, x + (col + ox) * pixel, y + (8 + oy) * pixel, pixel, color);
            }
        }
    };

    // Shadow layer offset by one texel
    stamp(shadow, 1, 1);
    if style.bold {
        stamp(shadow, 2, 1);
    }
    stamp(fg, 0, 0);
    if style.bold {
        stamp(fg, 1, 0);
    }

    advance_texels * pixel
}

fn fill_texel(img: &mut RgbaImage, x: u32, y: u32, pixel: u32, color: [u8; 3]) {
    for dy in 0..pixel {
        for dx in 0..pixel {
            let (px, py) = (x + dx, y + dy);
            if px < img.width() && py < img.height() {
                img.put_pixel(px, py, Rgba([color[0], color[1], color[2], 255]));
            }
        }
    }
}

/// Printable ASCII 0x20..=0x7E, bit `i` = column `i` of each row.
#[rustfmt::skip]
const ASCII: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x0C, 0x1E, 0x1E, 0x0C, 0x0C, 0x00, 0x0C, 0x00], // !
    [0x36, 0x36, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x36, 0x36, 0x7F, 0x36, 0x7F, 0x36, 0x36, 0x00], // #
    [0x0C, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x0C, 0x00], // $
    [0x00, 0x63, 0x33, 0x18, 0x0C, 0x66, 0x63, 0x00], // %
    [0x1C, 0x36, 0x1C, 0x6E, 0x3B, 0x33, 0x6E, 0x00], // &
    [0x0C, 0x0C, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x18, 0x0C, 0x06, 0x06, 0x06, 0x0C, 0x18, 0x00], // (
    [0x06, 0x0C, 0x18, 0x18, 0x18, 0x0C, 0x06, 0x00], // )
    [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // *
    [0x00, 0x0C, 0x0C, 0x3F, 0x0C, 0x0C, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ,
    [0x00, 0x00, 0x00, 0x3F, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x00], // .
    [0x60, 0x30, 0x18, 0x0C, 0x06, 0x03, 0x01, 0x00], // /
    [0x3E, 0x63, 0x73, 0x7B, 0x6F, 0x67, 0x3E, 0x00], // 0
    [0x0C, 0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x3F, 0x00], // 1
    [0x1E, 0x33, 0x30, 0x1C, 0x06, 0x33, 0x3F, 0x00], // 2
    [0x1E, 0x33, 0x30, 0x1C, 0x30, 0x33, 0x1E, 0x00], // 3
    [0x38, 0x3C, 0x36, 0x33, 0x7F, 0x30, 0x78, 0x00], // 4
    [0x3F, 0x03, 0x1F, 0x30, 0x30, 0x33, 0x1E, 0x00], // 5
    [0x1C, 0x06, 0x03, 0x1F, 0x33, 0x33, 0x1E, 0x00], // 6
    [0x3F, 0x33, 0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x00], // 7
    [0x1E, 0x33, 0x33, 0x1E, 0x33, 0x33, 0x1E, 0x00], // 8
    [0x1E, 0x33, 0x33, 0x3E, 0x30, 0x18, 0x0E, 0x00], // 9
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x00], // :
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ;
    [0x18, 0x0C, 0x06, 0x03, 0x06, 0x0C, 0x18, 0x00], // <
    [0x00, 0x00, 0x3F, 0x00, 0x00, 0x3F, 0x00, 0x00], // =
    [0x06, 0x0C, 0x18, 0x30, 0x18, 0x0C, 0x06, 0x00], // >
    [0x1E, 0x33, 0x30, 0x18, 0x0C, 0x00, 0x0C, 0x00], // ?
    [0x3E, 0x63, 0x7B, 0x7B, 0x7B, 0x03, 0x1E, 0x00], // @
    [0x0C, 0x1E, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x00], // A
    [0x3F, 0x66, 0x66, 0x3E, 0x66, 0x66, 0x3F, 0x00], // B
    [0x3C, 0x66, 0x03, 0x03, 0x03, 0x66, 0x3C, 0x00], // C
    [0x1F, 0x36, 0x66, 0x66, 0x66, 0x36, 0x1F, 0x00], // D
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x46, 0x7F, 0x00], // E
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x06, 0x0F, 0x00], // F
    [0x3C, 0x66, 0x03, 0x03, 0x73, 0x66, 0x7C, 0x00], // G
    [0x33, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x33, 0x00], // H
    [0x1E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // I
    [0x78, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E, 0x00], // J
    [0x67, 0x66, 0x36, 0x1E, 0x36, 0x66, 0x67, 0x00], // K
    [0x0F, 0x06, 0x06, 0x06, 0x46, 0x66, 0x7F, 0x00], // L
    [0x63, 0x77, 0x7F, 0x7F, 0x6B, 0x63, 0x63, 0x00], // M
    [0x63, 0x67, 0x6F, 0x7B, 0x73, 0x63, 0x63, 0x00], // N
    [0x1C, 0x36, 0x63, 0x63, 0x63, 0x36, 0x1C, 0x00], // O
    [0x3F, 0x66, 0x66, 0x3E, 0x06, 0x06, 0x0F, 0x00], // P
    [0x1E, 0x33, 0x33, 0x33, 0x3B, 0x1E, 0x38, 0x00], // Q
    [0x3F, 0x66, 0x66, 0x3E, 0x36, 0x66, 0x67, 0x00], // R
    [0x1E, 0x33, 0x07, 0x0E, 0x38, 0x33, 0x1E, 0x00], // S
    [0x3F, 0x2D, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // T
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x3F, 0x00], // U
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // V
    [0x63, 0x63, 0x63, 0x6B, 0x7F, 0x77, 0x63, 0x00], // W
    [0x63, 0x63, 0x36, 0x1C, 0x1C, 0x36, 0x63, 0x00], // X
    [0x33, 0x33, 0x33, 0x1E, 0x0C, 0x0C, 0x1E, 0x00], // Y
    [0x7F, 0x63, 0x31, 0x18, 0x4C, 0x66, 0x7F, 0x00], // Z
    [0x1E, 0x06, 0x06, 0x06, 0x06, 0x06, 0x1E, 0x00], // [
    [0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x40, 0x00], // backslash
    [0x1E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x1E, 0x00], // ]
    [0x08, 0x1C, 0x36, 0x63, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF], // _
    [0x0C, 0x0C, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x1E, 0x30, 0x3E, 0x33, 0x6E, 0x00], // a
    [0x07, 0x06, 0x06, 0x3E, 0x66, 0x66, 0x3B, 0x00], // b
    [0x00, 0x00, 0x1E, 0x33, 0x03, 0x33, 0x1E, 0x00], // c
    [0x38, 0x30, 0x30, 0x3E, 0x33, 0x33, 0x6E, 0x00], // d
    [0x00, 0x00, 0x1E, 0x33, 0x3F, 0x03, 0x1E, 0x00], // e
    [0x1C, 0x36, 0x06, 0x0F, 0x06, 0x06, 0x0F, 0x00], // f
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x1F], // g
    [0x07, 0x06, 0x36, 0x6E, 0x66, 0x66, 0x67, 0x00], // h
    [0x0C, 0x00, 0x0E, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // i
    [0x30, 0x00, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E], // j
    [0x07, 0x06, 0x66, 0x36, 0x1E, 0x36, 0x67, 0x00], // k
    [0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // l
    [0x00, 0x00, 0x33, 0x7F, 0x7F, 0x6B, 0x63, 0x00], // m
    [0x00, 0x00, 0x1F, 0x33, 0x33, 0x33, 0x33, 0x00], // n
    [0x00, 0x00, 0x1E, 0x33, 0x33, 0x33, 0x1E, 0x00], // o
    [0x00, 0x00, 0x3B, 0x66, 0x66, 0x3E, 0x06, 0x0F], // p
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x78], // q
    [0x00, 0x00, 0x3B, 0x6E, 0x66, 0x06, 0x0F, 0x00], // r
    [0x00, 0x00, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x00], // s
    [0x08, 0x0C, 0x3E, 0x0C, 0x0C, 0x2C, 0x18, 0x00], // t
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x33, 0x6E, 0x00], // u
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // v
    [0x00, 0x00, 0x63, 0x6B, 0x7F, 0x7F, 0x36, 0x00], // w
    [0x00, 0x00, 0x63, 0x36, 0x1C, 0x36, 0x63, 0x00], // x
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x3E, 0x30, 0x1F], // y
    [0x00, 0x00, 0x3F, 0x19, 0x0C, 0x26, 0x3F, 0x00], // z
    [0x38, 0x0C, 0x0C, 0x07, 0x0C, 0x0C, 0x38, 0x00], // {
    [0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00], // |
    [0x07, 0x0C, 0x0C, 0x38, 0x0C, 0x0C, 0x07, 0x00], // }
    [0x6E, 0x3B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ~
];
