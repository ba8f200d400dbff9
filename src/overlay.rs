//! Overlay recoloring
//!
//! Overlays are bundled sprite layers (leather armor trims, potion liquid,
//! egg shells) that get tinted to a requested color and composited with a
//! base sprite. Each overlay names a renderer strategy; unknown strategy
//! names are a data error, not a silent no-op, since they mean the bundled
//! table is corrupt.

use crate::atlas::upscale;
use image::RgbaImage;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("unknown overlay `{0}`")]
    UnknownOverlay(String),
    #[error("unknown overlay renderer type `{0}`")]
    UnknownRendererType(String),
    #[error("invalid hex color `{0}` in overlay color option")]
    InvalidHexColor(String),
    #[error("overlay table is malformed: {0}")]
    Table(String),
}

/// Recoloring strategy, selected per overlay by the bundled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Multiply every non-transparent pixel by one resolved color, with an
    /// optional de-tint against the art's default color first.
    Normal,
    /// Source RGB looks up a palette index into the supplied color array;
    /// unmapped pixels pass through.
    Mapped,
    /// Two sprite regions tinted by two colors and composited (two-tone
    /// items such as spawn eggs).
    DualLayer,
}

impl RendererKind {
    pub fn from_name(name: &str) -> Result<Self, OverlayError> {
        match name.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "mapped" => Ok(Self::Mapped),
            "dual_layer" => Ok(Self::DualLayer),
            other => Err(OverlayError::UnknownRendererType(other.to_string())),
        }
    }
}

/// Where the resolved colors land: the base sprite (overlay art stays
/// untinted on top) or the overlay art itself (base stays untouched).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColorMode {
    Base,
    Overlay,
}

/// Per-overlay color vocabulary and fallback policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverlayColorOptions {
    /// Named option -> resolved color list. Keys stored lowercase.
    #[serde(default)]
    pub named: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub default_colors: Vec<String>,
    #[serde(default)]
    pub allow_hex_colors: bool,
    #[serde(default)]
    pub use_default_if_missing: bool,
}

impl OverlayColorOptions {
    /// Resolve a caller-supplied option through the fallback chain:
    /// named table hit, raw hex list (if permitted), defaults (if
    /// permitted), then nothing.
    pub fn resolve(&self, option: &str) -> Result<Option<Vec<[u8; 3]>>, OverlayError> {
        let key = option.trim().to_ascii_lowercase();

        if let Some(colors) = self.named.get(&key) {
            return Ok(Some(parse_hex_list(colors)?));
        }

        if self.allow_hex_colors && !key.is_empty() {
            let parts: Vec<String> = key.split(',').map(|s| s.trim().to_string()).collect();
            if parts.iter().all(|p| looks_like_hex(p)) {
                return Ok(Some(parse_hex_list(&parts)?));
            }
        }

        if self.use_default_if_missing && !self.default_colors.is_empty() {
            return Ok(Some(parse_hex_list(&self.default_colors)?));
        }

        Ok(None)
    }
}

fn looks_like_hex(s: &str) -> bool {
    let s = s.strip_prefix('#').unwrap_or(s);
    s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_hex_list(values: &[String]) -> Result<Vec<[u8; 3]>, OverlayError> {
    values.iter().map(|v| parse_hex(v)).collect()
}

fn parse_hex(value: &str) -> Result<[u8; 3], OverlayError> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 {
        return Err(OverlayError::InvalidHexColor(value.to_string()));
    }
    let n = u32::from_str_radix(hex, 16)
        .map_err(|_| OverlayError::InvalidHexColor(value.to_string()))?;
    Ok([(n >> 16) as u8, (n >> 8) as u8, n as u8])
}

/// One loaded overlay: its art, strategy, and color vocabulary.
pub struct Overlay {
    pub name: String,
    pub image: RgbaImage,
    /// Second sprite region for dual-layer overlays.
    pub secondary: Option<RgbaImage>,
    pub renderer: RendererKind,
    pub color_options: OverlayColorOptions,
    /// Source RGB -> palette index, for the mapped renderer.
    pub color_map: HashMap<[u8; 3], usize>,
    /// The art's shipped tint, divided out when de-tinting.
    pub default_tint: Option<[u8; 3]>,
}

impl Overlay {
    /// Tint and composite this overlay onto `base`. `colors` of `None`
    /// composites the art untouched. The art is authored at native sprite
    /// resolution and is upscaled to the base dimensions before compositing.
    pub fn apply(&self, base: &mut RgbaImage, colors: Option<&[[u8; 3]]>, mode: OverlayColorMode) {
        let Some(colors) = colors.filter(|c| !c.is_empty()) else {
            let art = match_resolution(self.image.clone(), base);
            composite_over(base, &art);
            return;
        };

        match mode {
            OverlayColorMode::Base => {
                // Recolor the base sprite, then the untinted art on top.
                // De-tinting only makes sense here, where the target pixels
                // are shipped pre-tinted art.
                self.recolor(base, colors, self.default_tint);
                let art = match_resolution(self.image.clone(), base);
                composite_over(base, &art);
            }
            OverlayColorMode::Overlay => {
                if self.renderer == RendererKind::DualLayer {
                    if let Some(secondary) = &self.secondary {
                        let under = colors.get(1).copied().unwrap_or(colors[0]);
                        let mut layer = secondary.clone();
                        tint_normal(&mut layer, under, None);
                        let layer = match_resolution(layer, base);
                        composite_over(base, &layer);
                    }
                }
                let mut layer = self.image.clone();
                self.recolor(&mut layer, colors, None);
                let layer = match_resolution(layer, base);
                composite_over(base, &layer);
            }
        }
    }

    fn recolor(&self, img: &mut RgbaImage, colors: &[[u8; 3]], detint: Option<[u8; 3]>) {
        match self.renderer {
            RendererKind::Normal | RendererKind::DualLayer => {
                tint_normal(img, colors[0], detint);
            }
            RendererKind::Mapped => tint_mapped(img, &self.color_map, colors),
        }
    }
}

/// Multiply every non-transparent pixel by `target`. With a de-tint
/// reference and non-grayscale art, the shipped tint is divided out first
/// so arbitrary hues come through without banding.
fn tint_normal(img: &mut RgbaImage, target: [u8; 3], detint: Option<[u8; 3]>) {
    let detint = detint.filter(|_| !is_grayscale(img));

    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        let out = match detint {
            Some(default) => [
                detint_channel(r, target[0], default[0]),
                detint_channel(g, target[1], default[1]),
                detint_channel(b, target[2], default[2]),
            ],
            None => [
                mul_channel(r, target[0]),
                mul_channel(g, target[1]),
                mul_channel(b, target[2]),
            ],
        };
        px.0 = [out[0], out[1], out[2], a];
    }
}

fn mul_channel(src: u8, target: u8) -> u8 {
    ((src as u32 * target as u32) / 255) as u8
}

fn detint_channel(src: u8, target: u8, default: u8) -> u8 {
    if default == 0 {
        return mul_channel(src, target);
    }
    ((src as u32 * target as u32) / default as u32).min(255) as u8
}

/// Swap mapped source colors for entries of `colors`; everything else
/// passes through. An empty color array leaves the art untouched.
fn tint_mapped(img: &mut RgbaImage, map: &HashMap<[u8; 3], usize>, colors: &[[u8; 3]]) {
    if colors.is_empty() {
        return;
    }
    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        if let Some(&index) = map.get(&[r, g, b]) {
            if let Some(&[nr, ng, nb]) = colors.get(index) {
                px.0 = [nr, ng, nb, a];
            }
        }
    }
}

/// Sampled grayscale probe: up to 100 non-transparent pixels on a coarse
/// grid, channels within ±2 of each other.
fn is_grayscale(img: &RgbaImage) -> bool {
    let (w, h) = img.dimensions();
    let step = (h / 10).max(1);
    let mut samples = 0;

    let mut y = 0;
    while y < h && samples < 100 {
        let mut x = 0;
        while x < w && samples < 100 {
            let [r, g, b, a] = img.get_pixel(x, y).0;
            if a != 0 {
                let (lo, hi) = (r.min(g).min(b), r.max(g).max(b));
                if hi - lo > 2 {
                    return false;
                }
                samples += 1;
            }
            x += step;
        }
        y += step;
    }

    true
}

/// Nearest-neighbor upscale of overlay art to the frame it lands on, so a
/// 16-texel layer covers an upscaled sprite instead of its top-left corner.
fn match_resolution(art: RgbaImage, base: &RgbaImage) -> RgbaImage {
    let fw = base.width() / art.width().max(1);
    let fh = base.height() / art.height().max(1);
    let factor = fw.min(fh).max(1);
    if factor == 1 {
        art
    } else {
        upscale(&art, factor)
    }
}

/// Standard source-over alpha composite.
pub fn composite_over(base: &mut RgbaImage, top: &RgbaImage) {
    let w = base.width().min(top.width());
    let h = base.height().min(top.height());
    for y in 0..h {
        for x in 0..w {
            let t = top.get_pixel(x, y).0;
            if t[3] == 0 {
                continue;
            }
            if t[3] == 255 {
                base.put_pixel(x, y, image::Rgba(t));
                continue;
            }
            let b = base.get_pixel(x, y).0;
            let ta = t[3] as u32;
            let ba = b[3] as u32 * (255 - ta) / 255;
            let oa = ta + ba;
            let blend = |tc: u8, bc: u8| -> u8 {
                ((tc as u32 * ta + bc as u32 * ba) / oa.max(1)) as u8
            };
            base.put_pixel(
                x,
                y,
                image::Rgba([blend(t[0], b[0]), blend(t[1], b[1]), blend(t[2], b[2]), oa as u8]),
            );
        }
    }
}

/// All overlays known to the process, loaded once at startup.
#[derive(Default)]
pub struct OverlayRegistry {
    overlays: HashMap<String, Overlay>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, overlay: Overlay) {
        self.overlays.insert(overlay.name.to_ascii_lowercase(), overlay);
    }

    pub fn get(&self, name: &str) -> Result<&Overlay, OverlayError> {
        self.overlays
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| OverlayError::UnknownOverlay(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// One row of the bundled overlay table.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayDef {
    pub name: String,
    /// Atlas sprite holding the overlay art.
    pub sprite: String,
    #[serde(default)]
    pub secondary_sprite: Option<String>,
    pub renderer: String,
    #[serde(default)]
    pub color_options: OverlayColorOptions,
    /// Hex source color -> palette index, for mapped overlays.
    #[serde(default)]
    pub color_map: HashMap<String, usize>,
    #[serde(default)]
    pub default_tint: Option<String>,
}

/// Build the registry from the bundled JSON table, cropping art out of the
/// atlas. Any malformed row poisons the whole load; a partially loaded
/// registry would silently mis-render.
pub fn load_registry(
    table: &str,
    atlas: &crate::atlas::SpriteAtlas,
) -> Result<OverlayRegistry, OverlayError> {
    let defs: Vec<OverlayDef> =
        serde_json::from_str(table).map_err(|e| OverlayError::Table(e.to_string()))?;

    let mut registry = OverlayRegistry::new();
    for def in defs {
        let renderer = RendererKind::from_name(&def.renderer)?;
        let image = atlas
            .sprite(&def.sprite)
            .map_err(|e| OverlayError::Table(e.to_string()))?;
        let secondary = match &def.secondary_sprite {
            Some(name) => {
                Some(atlas.sprite(name).map_err(|e| OverlayError::Table(e.to_string()))?)
            }
            None => None,
        };
        let color_map = def
            .color_map
            .iter()
            .map(|(hex, &index)| Ok((parse_hex(hex)?, index)))
            .collect::<Result<HashMap<[u8; 3], usize>, OverlayError>>()?;
        let default_tint = def.default_tint.as_deref().map(parse_hex).transpose()?;

        registry.insert(Overlay {
            name: def.name,
            image,
            secondary,
            renderer,
            color_options: def.color_options,
            color_map,
            default_tint,
        });
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    fn options(allow_hex: bool, use_default: bool) -> OverlayColorOptions {
        let mut named = HashMap::new();
        named.insert("red".to_string(), vec!["#FF0000".to_string()]);
        OverlayColorOptions {
            named,
            default_colors: vec!["#A06540".to_string()],
            allow_hex_colors: allow_hex,
            use_default_if_missing: use_default,
        }
    }

    #[test]
    fn test_renderer_kind_case_insensitive() {
        assert_eq!(RendererKind::from_name("NORMAL").unwrap(), RendererKind::Normal);
        assert_eq!(RendererKind::from_name("Dual_Layer").unwrap(), RendererKind::DualLayer);
    }

    #[test]
    fn test_unknown_renderer_is_error() {
        assert!(matches!(
            RendererKind::from_name("sparkly"),
            Err(OverlayError::UnknownRendererType(_))
        ));
    }

    #[test]
    fn test_resolve_named_option() {
        let resolved = options(false, false).resolve("Red").unwrap();
        assert_eq!(resolved, Some(vec![[255, 0, 0]]));
    }

    #[test]
    fn test_resolve_hex_list_when_allowed() {
        let resolved = options(true, false).resolve("#00FF00,#0000FF").unwrap();
        assert_eq!(resolved, Some(vec![[0, 255, 0], [0, 0, 255]]));
    }

    #[test]
    fn test_hex_rejected_when_not_allowed() {
        let resolved = options(false, false).resolve("#00FF00").unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_default_fallback() {
        let resolved = options(false, true).resolve("no_such_option").unwrap();
        assert_eq!(resolved, Some(vec![[0xA0, 0x65, 0x40]]));
    }

    #[test]
    fn test_no_fallback_yields_none() {
        assert_eq!(options(false, false).resolve("nope").unwrap(), None);
    }

    #[test]
    fn test_tint_normal_multiplies() {
        let mut img = solid(2, 2, [255, 255, 255, 255]);
        tint_normal(&mut img, [255, 85, 0], None);
        assert_eq!(img.get_pixel(0, 0).0, [255, 85, 0, 255]);
    }

    #[test]
    fn test_tint_skips_transparent() {
        let mut img = solid(1, 1, [200, 200, 200, 0]);
        tint_normal(&mut img, [0, 0, 0], None);
        assert_eq!(img.get_pixel(0, 0).0, [200, 200, 200, 0]);
    }

    #[test]
    fn test_detint_divides_out_default() {
        // Art shipped at half-red; de-tinting to full red restores full
        let mut img = solid(1, 1, [128, 30, 20, 255]);
        tint_normal(&mut img, [255, 60, 40], Some([128, 30, 20]));
        assert_eq!(img.get_pixel(0, 0).0, [255, 60, 40, 255]);
    }

    #[test]
    fn test_detint_skipped_for_grayscale_art() {
        let mut img = solid(1, 1, [200, 200, 200, 255]);
        tint_normal(&mut img, [255, 0, 0], Some([100, 50, 25]));
        // Grayscale art gets the plain multiply instead
        assert_eq!(img.get_pixel(0, 0).0, [200, 0, 0, 255]);
    }

    #[test]
    fn test_mapped_replaces_and_passes_through() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([99, 99, 99, 255]));
        let mut map = HashMap::new();
        map.insert([10, 20, 30], 0);
        tint_mapped(&mut img, &map, &[[1, 2, 3]]);
        assert_eq!(img.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [99, 99, 99, 255]);
    }

    #[test]
    fn test_mapped_empty_colors_is_identity() {
        let mut img = solid(1, 1, [10, 20, 30, 255]);
        let mut map = HashMap::new();
        map.insert([10, 20, 30], 0);
        tint_mapped(&mut img, &map, &[]);
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_registry_lookup_case_insensitive() {
        let mut registry = OverlayRegistry::new();
        registry.insert(Overlay {
            name: "Leather_Boots".to_string(),
            image: solid(2, 2, [255, 255, 255, 255]),
            secondary: None,
            renderer: RendererKind::Normal,
            color_options: OverlayColorOptions::default(),
            color_map: HashMap::new(),
            default_tint: None,
        });
        assert!(registry.get("leather_boots").is_ok());
        assert!(matches!(
            registry.get("iron_boots"),
            Err(OverlayError::UnknownOverlay(_))
        ));
    }

    #[test]
    fn test_apply_without_colors_composites_untinted() {
        let overlay = Overlay {
            name: "trim".to_string(),
            image: solid(2, 2, [10, 20, 30, 255]),
            secondary: None,
            renderer: RendererKind::Normal,
            color_options: OverlayColorOptions::default(),
            color_map: HashMap::new(),
            default_tint: None,
        };
        let mut base = solid(2, 2, [0, 0, 0, 255]);
        overlay.apply(&mut base, None, OverlayColorMode::Overlay);
        assert_eq!(base.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_apply_scales_art_to_base_dimensions() {
        let overlay = Overlay {
            name: "trim".to_string(),
            image: solid(16, 16, [255, 255, 255, 255]),
            secondary: None,
            renderer: RendererKind::Normal,
            color_options: OverlayColorOptions::default(),
            color_map: HashMap::new(),
            default_tint: None,
        };
        let mut base = solid(32, 32, [60, 60, 60, 255]);
        overlay.apply(&mut base, Some(&[[0, 255, 0]]), OverlayColorMode::Overlay);
        // Far corner sits outside the art's native footprint
        assert_eq!(base.get_pixel(30, 30).0, [0, 255, 0, 255]);
        assert_eq!(base.get_pixel(2, 2).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_load_registry_from_table() {
        use crate::atlas::{SpriteAtlas, SpriteRect};
        let atlas = SpriteAtlas::from_parts(
            RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255])),
            HashMap::from([("boots".to_string(), SpriteRect { x: 0, y: 0, w: 16, h: 16 })]),
        );
        let table = r##"[{
            "name": "leather_boots",
            "sprite": "boots",
            "renderer": "normal",
            "color_options": {
                "named": {"red": ["#FF0000"]},
                "allow_hex_colors": true
            },
            "default_tint": "#A06540"
        }]"##;
        let registry = load_registry(table, &atlas).unwrap();
        let overlay = registry.get("Leather_Boots").unwrap();
        assert_eq!(overlay.renderer, RendererKind::Normal);
        assert_eq!(overlay.default_tint, Some([0xA0, 0x65, 0x40]));
    }

    #[test]
    fn test_load_registry_rejects_bad_renderer() {
        use crate::atlas::{SpriteAtlas, SpriteRect};
        let atlas = SpriteAtlas::from_parts(
            RgbaImage::new(4, 4),
            HashMap::from([("x".to_string(), SpriteRect { x: 0, y: 0, w: 4, h: 4 })]),
        );
        let table = r#"[{"name": "bad", "sprite": "x", "renderer": "sparkly"}]"#;
        assert!(matches!(
            load_registry(table, &atlas),
            Err(OverlayError::UnknownRendererType(_))
        ));
    }

    #[test]
    fn test_apply_overlay_mode_leaves_base_under_transparent_art() {
        let mut art = solid(2, 2, [255, 255, 255, 255]);
        art.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let overlay = Overlay {
            name: "liquid".to_string(),
            image: art,
            secondary: None,
            renderer: RendererKind::Normal,
            color_options: OverlayColorOptions::default(),
            color_map: HashMap::new(),
            default_tint: None,
        };
        let mut base = solid(2, 2, [7, 7, 7, 255]);
        overlay.apply(&mut base, Some(&[[0, 255, 0]]), OverlayColorMode::Overlay);
        assert_eq!(base.get_pixel(0, 0).0, [7, 7, 7, 255]);
        assert_eq!(base.get_pixel(1, 1).0, [0, 255, 0, 255]);
    }
}
