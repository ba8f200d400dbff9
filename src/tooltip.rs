//! Tooltip compositing
//!
//! Lays parsed lines onto the classic dark tooltip panel: translucent
//! background, two-tone border ring, drop-shadowed text. Tooltips containing
//! obfuscated runs render as a short animation where those runs are redrawn
//! each frame with random same-width glyphs.

use crate::chat::Style;
use crate::effect::FrameSet;
use crate::font;
use crate::markup::Line;
use crate::settings::RenderSettings;
use image::{Rgba, RgbaImage};

/// Panel background and outer border ring color.
pub const BACKGROUND_RGB: [u8; 3] = [18, 3, 18];
/// Inner border ring color.
pub const BORDER_RGB: [u8; 3] = [37, 0, 94];

/// Obfuscated tooltips animate at 10 frames of 50 ms each.
pub const OBFUSCATION_FRAME_COUNT: usize = 10;
pub const OBFUSCATION_FRAME_DELAY_MS: u32 = 50;

/// A fully measured tooltip ready to rasterize.
pub struct Tooltip {
    lines: Vec<Line>,
    settings: RenderSettings,
}

impl Tooltip {
    pub fn new(lines: Vec<Line>, settings: RenderSettings) -> Self {
        Self { lines, settings }
    }

    /// Whether any run uses the obfuscated style, which forces animation.
    pub fn is_animated(&self) -> bool {
        self.lines
            .iter()
            .flat_map(|l| l.runs.iter())
            .any(|r| r.style.obfuscated)
    }

    /// Widest line in output pixels.
    fn largest_line_width(&self) -> u32 {
        let pixel = self.settings.pixel_size();
        self.lines
            .iter()
            .map(|line| line_width_px(line, pixel))
            .max()
            .unwrap_or(0)
    }

    /// Rasterize to a single image or, when obfuscated runs are present, to
    /// an animated frame set. Translucency is dropped while animating since
    /// the encoder has no partial alpha.
    pub fn render(&self) -> FrameSet {
        if !self.is_animated() {
            return FrameSet::Single(self.render_frame(self.settings.alpha, 0));
        }

        let frames = (0..OBFUSCATION_FRAME_COUNT)
            .map(|i| self.render_frame(255, i as u64 + 1))
            .collect();
        FrameSet::Animated { frames, delay_ms: OBFUSCATION_FRAME_DELAY_MS }
    }

    fn render_frame(&self, alpha: u8, obfuscation_seed: u64) -> RgbaImage {
        let pixel = self.settings.pixel_size();
        let start_xy = pixel * 5;
        let y_increment = pixel * 10;
        let first_line_pad = pixel * 2;

        let largest = self.largest_line_width();
        let width = start_xy + largest + start_xy;
        let height = start_xy
            + first_line_pad
            + y_increment * self.lines.len() as u32
            + self.settings.padding
            + start_xy;

        let mut img = RgbaImage::new(width, height);
        fill_background(&mut img, alpha);
        if self.settings.render_border {
            draw_border(&mut img, pixel);
        }

        let mut seed = obfuscation_seed.wrapping_mul(0x9E37_79B9);
        let mut y = start_xy + first_line_pad;
        for (index, line) in self.lines.iter().enumerate() {
            if index == 1 {
                y += self.settings.padding;
            }
            let mut x = start_xy;
            if self.settings.center_text {
                x += (largest - line_width_px(line, pixel)) / 2;
            }
            for run in &line.runs {
                x += draw_run(
                    &mut img,
                    &run.text,
                    x,
                    y,
                    run.color.rgb(),
                    run.color.shadow(),
                    &run.style,
                    pixel,
                    obfuscation_seed > 0,
                    &mut seed,
                );
            }
            y += y_increment;
        }

        img
    }
}

fn line_width_px(line: &Line, pixel: u32) -> u32 {
    line.runs
        .iter()
        .map(|r| font::text_width(&r.text, &r.style) * pixel)
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn draw_run(
    img: &mut RgbaImage,
    text: &str,
    x: u32,
    y: u32,
    fg: [u8; 3],
    shadow: [u8; 3],
    style: &Style,
    pixel: u32,
    animating: bool,
    seed: &mut u64,
) -> u32 {
    let mut advance = 0;
    for c in text.chars() {
        let drawn = if style.obfuscated && animating {
            font::random_same_width(c, seed)
        } else {
            c
        };
        advance += font::draw_char(img, drawn, x + advance, y, fg, shadow, style, pixel);
    }
    advance
}

fn fill_background(img: &mut RgbaImage, alpha: u8) {
    let [r, g, b] = BACKGROUND_RGB;
    let bg = Rgba([r, g, b, alpha]);
    for px in img.pixels_mut() {
        *px = bg;
    }
}

/// Two concentric 1-texel rings: the dark outline with its corners knocked
/// out, then the purple ring just inside it.
fn draw_border(img: &mut RgbaImage, pixel: u32) {
    let (w, h) = img.dimensions();
    draw_ring(img, 0, w, h, pixel, BACKGROUND_RGB);
    // Transparent corner texels give the classic rounded look
    let clear = Rgba([0, 0, 0, 0]);
    for (cx, cy) in [(0, 0), (w - pixel, 0), (0, h - pixel), (w - pixel, h - pixel)] {
        fill_rect(img, cx, cy, pixel, pixel, clear);
    }
    draw_ring(img, pixel, w, h, pixel, BORDER_RGB);
}

fn draw_ring(img: &mut RgbaImage, inset: u32, w: u32, h: u32, pixel: u32, rgb: [u8; 3]) {
    if w <= 2 * inset || h <= 2 * inset {
        return;
    }
    let color = Rgba([rgb[0], rgb[1], rgb[2], 255]);
    let (iw, ih) = (w - 2 * inset, h - 2 * inset);
    fill_rect(img, inset, inset, iw, pixel, color);
    fill_rect(img, inset, h - inset - pixel, iw, pixel, color);
    fill_rect(img, inset, inset, pixel, ih, color);
    fill_rect(img, w - inset - pixel, inset, pixel, ih, color);
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;
    use crate::settings::DEFAULT_ALPHA;

    fn tooltip_for(text: &str) -> Tooltip {
        let lines = parse(text, 38).unwrap();
        Tooltip::new(lines, RenderSettings::default())
    }

    #[test]
    fn test_plain_tooltip_is_single_frame() {
        let fs = tooltip_for("%%RED%%Aspect of the End").render();
        assert!(!fs.is_animated());
    }

    #[test]
    fn test_obfuscated_tooltip_animates() {
        let tooltip = tooltip_for("%%OBFUSCATED%%mystery");
        assert!(tooltip.is_animated());
        match tooltip.render() {
            FrameSet::Animated { frames, delay_ms } => {
                assert_eq!(frames.len(), OBFUSCATION_FRAME_COUNT);
                assert_eq!(delay_ms, OBFUSCATION_FRAME_DELAY_MS);
                let (w, h) = frames[0].dimensions();
                for f in &frames {
                    assert_eq!(f.dimensions(), (w, h));
                }
            }
            FrameSet::Single(_) => panic!("expected animation"),
        }
    }

    #[test]
    fn test_animated_frames_are_opaque() {
        let fs = tooltip_for("%%OBFUSCATED%%x").render();
        if let FrameSet::Animated { frames, .. } = fs {
            // Background translucency is dropped while animating (corners
            // stay knocked out)
            let center = frames[0].get_pixel(frames[0].width() / 2, frames[0].height() / 2);
            assert_eq!(center.0[3], 255);
        }
    }

    #[test]
    fn test_background_alpha_honored() {
        let fs = tooltip_for("hi").render();
        if let FrameSet::Single(img) = fs {
            // (6, 6) sits past both border rings and above the text block
            assert_eq!(img.get_pixel(6, 6).0[3], DEFAULT_ALPHA);
        } else {
            panic!("expected single frame");
        }
    }

    #[test]
    fn test_wider_text_makes_wider_panel() {
        let narrow = tooltip_for("hi").render();
        let wide = tooltip_for("hello there, wide line").render();
        assert!(wide.first().width() > narrow.first().width());
    }

    #[test]
    fn test_padding_adds_height() {
        let lines = parse("one\\ntwo", 38).unwrap();
        let plain = Tooltip::new(lines.clone(), RenderSettings::default()).render();
        let padded =
            Tooltip::new(lines, RenderSettings::default().with_padding(8)).render();
        assert_eq!(padded.first().height(), plain.first().height() + 8);
    }

    #[test]
    fn test_border_corners_knocked_out() {
        let fs = tooltip_for("hi").render();
        let img = fs.first();
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(img.width() - 1, img.height() - 1).0[3], 0);
    }

    #[test]
    fn test_borderless_panel_keeps_corners() {
        let lines = parse("hi", 38).unwrap();
        let fs = Tooltip::new(lines, RenderSettings::default().with_border(false)).render();
        assert_eq!(fs.first().get_pixel(0, 0).0[3], DEFAULT_ALPHA);
    }
}
