//! Sprite atlas loading and lookup
//!
//! The item art ships as one packed atlas image plus a JSON coordinate
//! table. Both are read once at startup and shared read-only across renders.
//! Lookups crop a fresh sprite out of the atlas; callers own the copy.

use image::RgbaImage;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("i/o error reading atlas: {0}")]
    Io(#[from] std::io::Error),
    #[error("atlas image failed to decode: {0}")]
    Image(#[from] image::ImageError),
    #[error("atlas coordinate table is malformed: {0}")]
    Table(#[from] serde_json::Error),
    #[error("unknown item `{0}`")]
    UnknownItem(String),
    #[error("sprite `{name}` lies outside the atlas image")]
    OutOfBounds { name: String },
}

/// One sprite's rectangle inside the atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpriteRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Packed item art with its name-to-rectangle table. Keys are matched
/// case-insensitively.
pub struct SpriteAtlas {
    image: RgbaImage,
    frames: HashMap<String, SpriteRect>,
}

impl SpriteAtlas {
    pub fn load(image_path: &Path, table_path: &Path) -> Result<Self, AtlasError> {
        let image = image::open(image_path)?.to_rgba8();
        let table = std::fs::read_to_string(table_path)?;
        let frames: HashMap<String, SpriteRect> = serde_json::from_str(&table)?;
        log::info!("loaded sprite atlas with {} entries", frames.len());
        Ok(Self::from_parts(image, frames))
    }

    pub fn from_parts(image: RgbaImage, frames: HashMap<String, SpriteRect>) -> Self {
        let frames = frames
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self { image, frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(&name.to_ascii_lowercase())
    }

    /// Crop the named sprite out of the atlas.
    pub fn sprite(&self, name: &str) -> Result<RgbaImage, AtlasError> {
        let rect = self
            .frames
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| AtlasError::UnknownItem(name.to_string()))?;

        let (aw, ah) = self.image.dimensions();
        if rect.x + rect.w > aw || rect.y + rect.h > ah {
            return Err(AtlasError::OutOfBounds { name: name.to_string() });
        }

        let mut out = RgbaImage::new(rect.w, rect.h);
        for y in 0..rect.h {
            for x in 0..rect.w {
                out.put_pixel(x, y, *self.image.get_pixel(rect.x + x, rect.y + y));
            }
        }
        Ok(out)
    }
}

/// Integer nearest-neighbor upscale, keeping pixel edges crisp.
pub fn upscale(img: &RgbaImage, factor: u32) -> RgbaImage {
    let factor = factor.max(1);
    if factor == 1 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    RgbaImage::from_fn(w * factor, h * factor, |x, y| {
        *img.get_pixel(x / factor, y / factor)
    })
}

/// Scale a sprite to fit inside `(max_w, max_h)` preserving aspect ratio,
/// nearest-neighbor.
pub fn scale_to_fit(img: &RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || max_w == 0 || max_h == 0 {
        return img.clone();
    }
    let sw = max_w as f32 / w as f32;
    let sh = max_h as f32 / h as f32;
    let s = sw.min(sh);
    let nw = ((w as f32 * s) as u32).max(1);
    let nh = ((h as f32 * s) as u32).max(1);
    RgbaImage::from_fn(nw, nh, |x, y| {
        *img.get_pixel((x * w / nw).min(w - 1), (y * h / nh).min(h - 1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn atlas() -> SpriteAtlas {
        let mut image = RgbaImage::new(32, 16);
        for y in 0..16 {
            for x in 0..16 {
                image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                image.put_pixel(x + 16, y, Rgba([0, 0, 255, 255]));
            }
        }
        let frames = HashMap::from([
            ("Diamond_Sword".to_string(), SpriteRect { x: 0, y: 0, w: 16, h: 16 }),
            ("emerald".to_string(), SpriteRect { x: 16, y: 0, w: 16, h: 16 }),
            ("broken".to_string(), SpriteRect { x: 30, y: 0, w: 16, h: 16 }),
        ]);
        SpriteAtlas::from_parts(image, frames)
    }

    #[test]
    fn test_sprite_lookup_case_insensitive() {
        let atlas = atlas();
        assert!(atlas.contains("diamond_sword"));
        let sprite = atlas.sprite("DIAMOND_SWORD").unwrap();
        assert_eq!(sprite.dimensions(), (16, 16));
        assert_eq!(sprite.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_unknown_item_is_error() {
        assert!(matches!(
            atlas().sprite("netherite_sword"),
            Err(AtlasError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_rect_is_error() {
        assert!(matches!(
            atlas().sprite("broken"),
            Err(AtlasError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_crop_takes_the_right_region() {
        let sprite = atlas().sprite("emerald").unwrap();
        assert_eq!(sprite.get_pixel(8, 8).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_upscale_is_nearest_neighbor() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        img.put_pixel(1, 0, Rgba([9, 8, 7, 255]));
        let big = upscale(&img, 4);
        assert_eq!(big.dimensions(), (8, 4));
        assert_eq!(big.get_pixel(3, 3).0, [1, 2, 3, 255]);
        assert_eq!(big.get_pixel(4, 0).0, [9, 8, 7, 255]);
    }

    #[test]
    fn test_upscale_factor_one_is_identity() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([5, 5, 5, 255]));
        assert_eq!(upscale(&img, 1), img);
    }

    #[test]
    fn test_scale_to_fit_preserves_aspect() {
        let img = RgbaImage::from_pixel(16, 8, Rgba([1, 1, 1, 255]));
        let scaled = scale_to_fit(&img, 32, 32);
        assert_eq!(scaled.dimensions(), (32, 16));
    }
}
