//! Enchantment glint animation
//!
//! Sweeps two rotated, scrolling samplings of a shared glint texture over a
//! base sprite, blended additively so only the RGB channels shimmer. The UV
//! scale shrinks with sprite resolution so the streak density looks the same
//! on a 16px item and a 128px upscale.

use image::RgbaImage;

pub const FRAME_DELAY_MS: u32 = 33;
pub const TOTAL_DURATION_MS: u32 = 6000;

/// Per-channel tint applied to every sampled texel.
const TINT: [f32; 3] = [0.5, 0.25, 0.8];
const INTENSITY: f32 = 0.75;
const SCROLL_SPEED: f32 = 0.3;
const UV_SCALE: f32 = 8.0;
/// Reference sprite edge; larger sprites scale the UV down proportionally.
const BASE_SPRITE_PIXELS: f32 = 16.0;

/// Number of frames in one full loop.
pub fn frame_count() -> usize {
    TOTAL_DURATION_MS.div_ceil(FRAME_DELAY_MS) as usize
}

struct GlintPass {
    angle_deg: f32,
    period_ms: f32,
    direction: f32,
}

const PASSES: [GlintPass; 2] = [
    GlintPass { angle_deg: -50.0, period_ms: 3000.0, direction: 1.0 },
    GlintPass { angle_deg: 10.0, period_ms: 4875.0, direction: -1.0 },
];

/// Shimmer generator around the process-wide glint texture.
pub struct GlintEngine {
    texture: RgbaImage,
}

impl GlintEngine {
    pub fn new(texture: RgbaImage) -> Self {
        Self { texture }
    }

    /// Produce the full animation loop for `base`. Every frame matches the
    /// base dimensions and keeps its alpha channel untouched.
    pub fn animate(&self, base: &RgbaImage) -> (Vec<RgbaImage>, u32) {
        let frames = (0..frame_count())
            .map(|i| {
                let mut frame = base.clone();
                self.apply_at(&mut frame, (i as u32 * FRAME_DELAY_MS) as f32);
                frame
            })
            .collect();
        (frames, FRAME_DELAY_MS)
    }

    /// Apply both shimmer passes to one frame at the given timestamp.
    pub fn apply_at(&self, frame: &mut RgbaImage, t_ms: f32) {
        for pass in &PASSES {
            self.apply_pass(frame, pass, t_ms);
        }
    }

    fn apply_pass(&self, frame: &mut RgbaImage, pass: &GlintPass, t_ms: f32) {
        let (w, h) = frame.dimensions();
        let (tw, th) = self.texture.dimensions();
        let resolution_scale = (w.max(h) as f32 / BASE_SPRITE_PIXELS).max(1.0);
        let uv_scale = UV_SCALE / resolution_scale;
        // One sprite covers BASE_SPRITE_PIXELS texels of the glint texture,
        // so larger textures repeat fewer times across the sprite.
        let span_u = BASE_SPRITE_PIXELS / tw.max(1) as f32 * uv_scale;
        let span_v = BASE_SPRITE_PIXELS / th.max(1) as f32 * uv_scale;

        let angle = pass.angle_deg.to_radians();
        let (sin, cos) = angle.sin_cos();
        let phase = (t_ms % pass.period_ms) / pass.period_ms;
        let scroll = pass.direction * phase * SCROLL_SPEED;

        for y in 0..h {
            for x in 0..w {
                if frame.get_pixel(x, y).0[3] == 0 {
                    continue;
                }

                let u0 = x as f32 / w as f32 * span_u;
                let v0 = y as f32 / h as f32 * span_v;
                let u = u0 * cos - v0 * sin + scroll;
                let v = u0 * sin + v0 * cos;

                let [sr, sg, sb, sa] = self.sample(u, v);
                let gain = sa * INTENSITY;

                let px = frame.get_pixel_mut(x, y);
                for (c, tint, s) in [(0, TINT[0], sr), (1, TINT[1], sg), (2, TINT[2], sb)] {
                    let cur = px.0[c] as f32 / 255.0;
                    let out = (cur + s * tint * gain).min(1.0);
                    px.0[c] = (out * 255.0 + 0.5) as u8;
                }
                // Alpha stays exactly as the base had it
            }
        }
    }

    /// Bilinear sample at normalized UV with wraparound on both axes and
    /// the usual half-texel centering offset.
    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let (tw, th) = self.texture.dimensions();
        let fx = u.rem_euclid(1.0) * tw as f32 - 0.5;
        let fy = v.rem_euclid(1.0) * th as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let dx = fx - x0;
        let dy = fy - y0;

        let texel = |xi: i64, yi: i64| -> [f32; 4] {
            let x = xi.rem_euclid(tw as i64) as u32;
            let y = yi.rem_euclid(th as i64) as u32;
            let p = self.texture.get_pixel(x, y).0;
            [
                p[0] as f32 / 255.0,
                p[1] as f32 / 255.0,
                p[2] as f32 / 255.0,
                p[3] as f32 / 255.0,
            ]
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let p00 = texel(x0, y0);
        let p10 = texel(x0 + 1, y0);
        let p01 = texel(x0, y0 + 1);
        let p11 = texel(x0 + 1, y0 + 1);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = p00[c] * (1.0 - dx) + p10[c] * dx;
            let bottom = p01[c] * (1.0 - dx) + p11[c] * dx;
            out[c] = top * (1.0 - dy) + bottom * dy;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker_texture(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn base_sprite() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([100, 100, 100, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(5, 5, Rgba([10, 10, 10, 128]));
        img
    }

    #[test]
    fn test_frame_count_covers_duration() {
        assert_eq!(frame_count(), TOTAL_DURATION_MS.div_ceil(FRAME_DELAY_MS) as usize);
        let engine = GlintEngine::new(checker_texture(8));
        let (frames, delay) = engine.animate(&base_sprite());
        assert_eq!(frames.len(), frame_count());
        assert_eq!(delay, FRAME_DELAY_MS);
    }

    #[test]
    fn test_frames_match_base_dimensions() {
        let engine = GlintEngine::new(checker_texture(8));
        let (frames, _) = engine.animate(&base_sprite());
        for f in &frames {
            assert_eq!(f.dimensions(), (16, 16));
        }
    }

    #[test]
    fn test_alpha_channel_preserved_exactly() {
        let engine = GlintEngine::new(checker_texture(8));
        let base = base_sprite();
        let (frames, _) = engine.animate(&base);
        for f in &frames {
            for (x, y, px) in f.enumerate_pixels() {
                assert_eq!(px.0[3], base.get_pixel(x, y).0[3]);
            }
        }
    }

    #[test]
    fn test_transparent_pixels_untouched() {
        let engine = GlintEngine::new(checker_texture(8));
        let base = base_sprite();
        let (frames, _) = engine.animate(&base);
        for f in &frames {
            assert_eq!(f.get_pixel(0, 0).0, [0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_glint_only_brightens() {
        let engine = GlintEngine::new(checker_texture(8));
        let base = base_sprite();
        let (frames, _) = engine.animate(&base);
        for (x, y, px) in frames[0].enumerate_pixels() {
            let b = base.get_pixel(x, y).0;
            for c in 0..3 {
                assert!(px.0[c] >= b[c], "additive blend never darkens");
            }
        }
    }

    #[test]
    fn test_uv_repeat_tracks_texture_size() {
        // A 64px texture covers four native sprites, so the streak pattern
        // repeats BASE_SPRITE_PIXELS / 64 * UV_SCALE = 2 times across a
        // 16px frame instead of 8.
        let texture = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let engine = GlintEngine::new(texture);
        let mut frame = RgbaImage::from_pixel(16, 16, Rgba([100, 100, 100, 255]));
        let pass = GlintPass { angle_deg: 0.0, period_ms: 1000.0, direction: 1.0 };
        engine.apply_pass(&mut frame, &pass, 0.0);

        // Columns under the opaque texture half brighten, the rest sample
        // zero alpha and stay untouched
        assert!(frame.get_pixel(2, 0).0[0] > 100);
        assert_eq!(frame.get_pixel(6, 0).0, [100, 100, 100, 255]);
        // One full repeat later the same column recurs
        assert_eq!(frame.get_pixel(2, 0), frame.get_pixel(10, 0));
    }

    #[test]
    fn test_animation_actually_moves() {
        let engine = GlintEngine::new(checker_texture(4));
        let (frames, _) = engine.animate(&base_sprite());
        // Some pair of frames must differ or the loop is static
        assert!(frames.windows(2).any(|w| w[0] != w[1]));
    }
}
