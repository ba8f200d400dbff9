//! Post-render effect pipeline
//!
//! A render starts as a single image and may become an animation partway
//! through (the glint effect converts it). Every effect therefore operates
//! on a [`FrameSet`] and must handle both shapes. The pipeline selects the
//! effects whose predicate holds, orders them by ascending priority and
//! folds them over the context.

use crate::glint::GlintEngine;
use crate::overlay::{OverlayColorMode, OverlayError, OverlayRegistry};
use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

/// A render product: either one still image or a frame list with a uniform
/// delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSet {
    Single(RgbaImage),
    Animated { frames: Vec<RgbaImage>, delay_ms: u32 },
}

impl FrameSet {
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated { .. })
    }

    /// The still image, or the first frame of an animation.
    pub fn first(&self) -> &RgbaImage {
        match self {
            Self::Single(img) => img,
            Self::Animated { frames, .. } => &frames[0],
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Animated { frames, .. } => frames.len(),
        }
    }

    /// Run `f` over every frame, or once for a still image.
    pub fn for_each_frame(&mut self, mut f: impl FnMut(&mut RgbaImage)) {
        match self {
            Self::Single(img) => f(img),
            Self::Animated { frames, .. } => frames.iter_mut().for_each(f),
        }
    }
}

/// Overlay layers requested for a sprite render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRequest {
    pub names: Vec<String>,
    pub color_option: Option<String>,
    pub mode: OverlayColorMode,
}

/// Everything an effect may consult or rewrite. Effects own no state of
/// their own; the context carries it all.
pub struct EffectContext<'a> {
    pub frames: FrameSet,
    pub overlay: Option<OverlayRequest>,
    pub enchanted: bool,
    pub hovered: bool,
    /// Remaining durability percent; `None` or >= 100 suppresses the bar.
    pub durability: Option<u8>,
    pub registry: &'a OverlayRegistry,
    pub glint: &'a GlintEngine,
}

/// One pipeline stage. Lower priority runs earlier.
pub trait ImageEffect: Send + Sync {
    fn priority(&self) -> i32;
    fn can_apply(&self, ctx: &EffectContext) -> bool;
    fn apply(&self, ctx: &mut EffectContext) -> Result<(), EffectError>;
}

pub struct EffectPipeline {
    effects: Vec<Box<dyn ImageEffect>>,
}

impl EffectPipeline {
    /// The standard stack: overlays establish the colored base, glint may
    /// convert to animation, hover tints, durability draws on top of
    /// everything.
    pub fn standard() -> Self {
        Self {
            effects: vec![
                Box::new(OverlayApplicationEffect),
                Box::new(GlintEffect),
                Box::new(HoverEffect),
                Box::new(DurabilityEffect),
            ],
        }
    }

    pub fn run(&self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        let mut selected: Vec<&dyn ImageEffect> = self
            .effects
            .iter()
            .map(AsRef::as_ref)
            .filter(|e| e.can_apply(ctx))
            .collect();
        selected.sort_by_key(|e| e.priority());
        for effect in selected {
            effect.apply(ctx)?;
        }
        Ok(())
    }
}

/// Applies requested overlay layers, priority 50. Runs first so later
/// effects see the finished colored sprite.
pub struct OverlayApplicationEffect;

impl ImageEffect for OverlayApplicationEffect {
    fn priority(&self) -> i32 {
        50
    }

    fn can_apply(&self, ctx: &EffectContext) -> bool {
        ctx.overlay.as_ref().is_some_and(|o| !o.names.is_empty())
    }

    fn apply(&self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        let Some(request) = ctx.overlay.clone() else {
            return Ok(());
        };
        let registry = ctx.registry;

        for name in &request.names {
            let overlay = registry.get(name)?;
            let colors = match &request.color_option {
                Some(option) => overlay.color_options.resolve(option)?,
                None => None,
            };
            ctx.frames.for_each_frame(|frame| {
                overlay.apply(frame, colors.as_deref(), request.mode);
            });
        }
        Ok(())
    }
}

/// Enchantment shimmer, priority 100. Converts a still render into an
/// animation; an already-animated render gets the shimmer per frame at that
/// frame's timestamp.
pub struct GlintEffect;

impl ImageEffect for GlintEffect {
    fn priority(&self) -> i32 {
        100
    }

    fn can_apply(&self, ctx: &EffectContext) -> bool {
        ctx.enchanted
    }

    fn apply(&self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        let glint = ctx.glint;
        let taken = std::mem::replace(&mut ctx.frames, FrameSet::Single(RgbaImage::new(1, 1)));
        ctx.frames = match taken {
            FrameSet::Single(img) => {
                let (frames, delay_ms) = glint.animate(&img);
                FrameSet::Animated { frames, delay_ms }
            }
            FrameSet::Animated { mut frames, delay_ms } => {
                for (i, frame) in frames.iter_mut().enumerate() {
                    glint.apply_at(frame, (i as u32 * delay_ms) as f32);
                }
                FrameSet::Animated { frames, delay_ms }
            }
        };
        Ok(())
    }
}

/// Hover tint, priority 200. Output is always fully opaque so animated
/// encodings never show transparency artifacts.
pub struct HoverEffect;

impl ImageEffect for HoverEffect {
    fn priority(&self) -> i32 {
        200
    }

    fn can_apply(&self, ctx: &EffectContext) -> bool {
        ctx.hovered
    }

    fn apply(&self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        ctx.frames.for_each_frame(|frame| {
            for px in frame.pixels_mut() {
                let [r, g, b, a] = px.0;
                px.0 = if a == 0 {
                    [128, 128, 128, 255]
                } else {
                    [blend_to_white(r), blend_to_white(g), blend_to_white(b), 255]
                };
            }
        });
        Ok(())
    }
}

fn blend_to_white(c: u8) -> u8 {
    ((c as u32 + 255) / 2) as u8
}

/// Durability bar, priority 300 so nothing draws over it.
pub struct DurabilityEffect;

impl ImageEffect for DurabilityEffect {
    fn priority(&self) -> i32 {
        300
    }

    fn can_apply(&self, ctx: &EffectContext) -> bool {
        ctx.durability.is_some_and(|pct| pct < 100)
    }

    fn apply(&self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        let Some(pct) = ctx.durability else {
            return Ok(());
        };
        ctx.frames.for_each_frame(|frame| draw_durability_bar(frame, pct));
        Ok(())
    }
}

/// Continuous green-to-yellow-to-red ramp over the percent range.
pub fn durability_color(pct: u8) -> [u8; 3] {
    let pct = pct.min(100) as u32;
    if pct > 50 {
        [(255 * 2 * (100 - pct) / 100).min(255) as u8, 255, 0]
    } else {
        [255, (255 * 2 * pct / 100).min(255) as u8, 0]
    }
}

fn draw_durability_bar(frame: &mut RgbaImage, pct: u8) {
    let (w, h) = frame.dimensions();
    // One texel in this sprite's resolution
    let scale = (w / 16).max(1);
    let bar_x = 2 * scale;
    let bar_width = w.saturating_sub(4 * scale) + scale;
    let color_y = h.saturating_sub(3 * scale);
    let black_y = h.saturating_sub(2 * scale);

    let black = Rgba([0, 0, 0, 255]);
    fill(frame, bar_x, color_y, bar_width, scale, black);
    fill(frame, bar_x, black_y, bar_width, scale, black);

    let fill_width = bar_width * pct.min(100) as u32 / 100;
    let [r, g, b] = durability_color(pct);
    fill(frame, bar_x, color_y, fill_width, scale, Rgba([r, g, b, 255]));
}

fn fill(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{Overlay, OverlayColorOptions, RendererKind};
    use std::collections::HashMap;

    fn engine() -> GlintEngine {
        GlintEngine::new(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])))
    }

    fn registry() -> OverlayRegistry {
        let mut r = OverlayRegistry::new();
        r.insert(Overlay {
            name: "trim".to_string(),
            image: RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])),
            secondary: None,
            renderer: RendererKind::Normal,
            color_options: OverlayColorOptions {
                named: HashMap::from([("red".to_string(), vec!["#FF0000".to_string()])]),
                ..OverlayColorOptions::default()
            },
            color_map: HashMap::new(),
            default_tint: None,
        });
        r
    }

    fn context<'a>(
        registry: &'a OverlayRegistry,
        glint: &'a GlintEngine,
        base: RgbaImage,
    ) -> EffectContext<'a> {
        EffectContext {
            frames: FrameSet::Single(base),
            overlay: None,
            enchanted: false,
            hovered: false,
            durability: None,
            registry,
            glint,
        }
    }

    fn sprite() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([60, 60, 60, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img
    }

    #[test]
    fn test_pipeline_skips_inapplicable_effects() {
        let (reg, eng) = (registry(), engine());
        let base = sprite();
        let mut ctx = context(&reg, &eng, base.clone());
        EffectPipeline::standard().run(&mut ctx).unwrap();
        assert_eq!(ctx.frames, FrameSet::Single(base));
    }

    #[test]
    fn test_glint_converts_to_animation() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.enchanted = true;
        EffectPipeline::standard().run(&mut ctx).unwrap();
        assert!(ctx.frames.is_animated());
        assert_eq!(ctx.frames.frame_count(), crate::glint::frame_count());
    }

    #[test]
    fn test_hover_makes_everything_opaque() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.hovered = true;
        EffectPipeline::standard().run(&mut ctx).unwrap();
        let img = ctx.frames.first();
        assert_eq!(img.get_pixel(0, 0).0, [128, 128, 128, 255]);
        for px in img.pixels() {
            assert_eq!(px.0[3], 255);
        }
    }

    #[test]
    fn test_hover_blends_toward_white() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.hovered = true;
        HoverEffect.apply(&mut ctx).unwrap();
        // (60 + 255) / 2 = 157
        assert_eq!(ctx.frames.first().get_pixel(5, 5).0, [157, 157, 157, 255]);
    }

    #[test]
    fn test_durability_suppressed_at_full() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.durability = Some(100);
        assert!(!DurabilityEffect.can_apply(&ctx));
        ctx.durability = None;
        assert!(!DurabilityEffect.can_apply(&ctx));
        ctx.durability = Some(99);
        assert!(DurabilityEffect.can_apply(&ctx));
    }

    #[test]
    fn test_durability_ramp_boundaries() {
        assert_eq!(durability_color(50), [255, 255, 0], "midpoint is pure yellow");
        assert_eq!(durability_color(0), [255, 0, 0]);
        assert_eq!(durability_color(100), [0, 255, 0]);
        // 75 percent sits halfway into the green band
        assert_eq!(durability_color(75), [127, 255, 0]);
    }

    #[test]
    fn test_durability_zero_fill_keeps_baseline() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.durability = Some(0);
        DurabilityEffect.apply(&mut ctx).unwrap();
        let img = ctx.frames.first();
        let (w, h) = img.dimensions();
        let scale = w / 16;
        // Baseline row is black, color row has no fill
        assert_eq!(img.get_pixel(2 * scale, h - 2 * scale).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(2 * scale, h - 3 * scale).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_durability_fill_width_tracks_percent() {
        let mut frame = RgbaImage::from_pixel(100, 100, Rgba([9, 9, 9, 255]));
        draw_durability_bar(&mut frame, 75);
        let (w, h) = frame.dimensions();
        let scale = w / 16;
        let bar_width = w - 4 * scale + scale;
        let expected_fill = bar_width * 75 / 100;
        let color_y = h - 3 * scale;
        let fill_color = durability_color(75);
        let mut run = 0;
        for x in 2 * scale..2 * scale + bar_width {
            if frame.get_pixel(x, color_y).0 == [fill_color[0], fill_color[1], fill_color[2], 255] {
                run += 1;
            }
        }
        assert_eq!(run, expected_fill);
    }

    #[test]
    fn test_overlay_effect_recolors() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.overlay = Some(OverlayRequest {
            names: vec!["trim".to_string()],
            color_option: Some("red".to_string()),
            mode: OverlayColorMode::Overlay,
        });
        EffectPipeline::standard().run(&mut ctx).unwrap();
        // White overlay art times red lands on pure red
        assert_eq!(ctx.frames.first().get_pixel(8, 8).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_overlay_covers_upscaled_sprite() {
        let (reg, eng) = (registry(), engine());
        // Scale-2 frame from a 16-texel sprite: the 16x16 art must stretch
        // over all of it, not just the native top-left quadrant.
        let base = crate::atlas::upscale(&sprite(), 2);
        let mut ctx = context(&reg, &eng, base);
        ctx.overlay = Some(OverlayRequest {
            names: vec!["trim".to_string()],
            color_option: None,
            mode: OverlayColorMode::Base,
        });
        EffectPipeline::standard().run(&mut ctx).unwrap();
        let img = ctx.frames.first();
        assert_eq!(img.dimensions(), (32, 32));
        assert_eq!(img.get_pixel(8, 8).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(24, 24).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_unknown_overlay_fails_pipeline() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.overlay = Some(OverlayRequest {
            names: vec!["no_such_overlay".to_string()],
            color_option: None,
            mode: OverlayColorMode::Overlay,
        });
        let err = EffectPipeline::standard().run(&mut ctx).unwrap_err();
        assert!(matches!(err, EffectError::Overlay(OverlayError::UnknownOverlay(_))));
    }

    #[test]
    fn test_later_effects_handle_animation() {
        let (reg, eng) = (registry(), engine());
        let mut ctx = context(&reg, &eng, sprite());
        ctx.enchanted = true;
        ctx.hovered = true;
        ctx.durability = Some(40);
        EffectPipeline::standard().run(&mut ctx).unwrap();
        assert!(ctx.frames.is_animated());
        // Hover ran after glint, over every frame
        if let FrameSet::Animated { frames, .. } = &ctx.frames {
            for f in frames {
                for px in f.pixels() {
                    assert_eq!(px.0[3], 255);
                }
            }
        }
    }
}
