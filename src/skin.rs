//! Player skin lookup and head rendering
//!
//! Resolves whatever the caller supplied (a raw texture hash, a base64
//! profile blob, a short player name, or a full texture URL) down to a
//! texture id, fetches the skin, and renders the flat head (face layer with
//! the hat layer composited on top).
//!
//! Only the network calls are transient; every other failure here is a
//! deterministic function of the input and must not be retried.

use crate::atlas::upscale;
use crate::overlay::composite_over;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use regex::Regex;
use std::io::Read;
use std::sync::OnceLock;
use thiserror::Error;

const TEXTURE_BASE_URL: &str = "http://textures.minecraft.net/texture/";
const PROFILE_BY_NAME_URL: &str = "https://api.mojang.com/users/profiles/minecraft/";
const SESSION_PROFILE_URL: &str = "https://sessionserver.mojang.com/session/minecraft/profile/";

/// Longest legal player name; anything longer must be a hash, blob or URL.
const MAX_NAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum SkinError {
    /// Outbound lookup failed. The one retryable case.
    #[error("skin lookup failed: {0}")]
    Network(String),
    #[error("no player named `{0}`")]
    UnknownPlayer(String),
    #[error("profile for `{0}` carries no skin texture")]
    MissingTexture(String),
    #[error("`{0}` is not a texture hash, player name or texture url")]
    UnrecognizedInput(String),
    #[error("skin image failed to decode: {0}")]
    Decode(#[from] image::ImageError),
}

impl SkinError {
    /// Whether a caller may reasonably retry after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

fn texture_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"textures\.minecraft\.net/texture/([0-9a-fA-F]+)")
            .expect("texture url pattern is valid")
    })
}

fn is_texture_hash(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Fetches skins. The trait seam lets tests and offline callers substitute
/// a canned source.
pub trait SkinSource {
    /// Resolve caller input to a texture id.
    fn resolve_texture_id(&self, input: &str) -> Result<String, SkinError>;
    /// Download the skin image for a texture id.
    fn fetch_skin(&self, texture_id: &str) -> Result<RgbaImage, SkinError>;
}

/// Live Mojang-backed source.
#[derive(Default)]
pub struct MojangSkinSource;

impl MojangSkinSource {
    fn profile_blob_for_name(&self, name: &str) -> Result<String, SkinError> {
        let response = ureq::get(&format!("{PROFILE_BY_NAME_URL}{name}"))
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(404 | 204, _) => SkinError::UnknownPlayer(name.to_string()),
                other => SkinError::Network(other.to_string()),
            })?;
        // Older endpoints answer unknown names with an empty 204
        if response.status() == 204 {
            return Err(SkinError::UnknownPlayer(name.to_string()));
        }
        let profile: serde_json::Value = response
            .into_json()
            .map_err(|e| SkinError::Network(e.to_string()))?;
        let uuid = profile["id"]
            .as_str()
            .ok_or_else(|| SkinError::UnknownPlayer(name.to_string()))?
            .to_string();

        let session: serde_json::Value = ureq::get(&format!("{SESSION_PROFILE_URL}{uuid}"))
            .call()
            .map_err(|e| SkinError::Network(e.to_string()))?
            .into_json()
            .map_err(|e| SkinError::Network(e.to_string()))?;
        session["properties"][0]["value"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SkinError::MissingTexture(name.to_string()))
    }
}

/// Pull the texture id out of a base64 profile blob.
fn texture_id_from_blob(blob: &str, origin: &str) -> Result<String, SkinError> {
    let decoded = BASE64
        .decode(blob.trim())
        .map_err(|_| SkinError::UnrecognizedInput(origin.to_string()))?;
    let json: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|_| SkinError::UnrecognizedInput(origin.to_string()))?;
    let url = json["textures"]["SKIN"]["url"]
        .as_str()
        .ok_or_else(|| SkinError::MissingTexture(origin.to_string()))?;
    texture_id_from_url(url).ok_or_else(|| SkinError::MissingTexture(origin.to_string()))
}

fn texture_id_from_url(url: &str) -> Option<String> {
    texture_url_regex()
        .captures(url)
        .map(|c| c[1].to_ascii_lowercase())
}

impl SkinSource for MojangSkinSource {
    fn resolve_texture_id(&self, input: &str) -> Result<String, SkinError> {
        let input = input.trim();

        if is_texture_hash(input) {
            return Ok(input.to_ascii_lowercase());
        }
        // Profile blobs are long base64; try those before name lookup
        if input.len() > MAX_NAME_LEN {
            if let Some(id) = texture_id_from_url(input) {
                return Ok(id);
            }
            return texture_id_from_blob(input, input);
        }
        if input.is_empty() {
            return Err(SkinError::UnrecognizedInput(input.to_string()));
        }

        let blob = self.profile_blob_for_name(input)?;
        texture_id_from_blob(&blob, input)
    }

    fn fetch_skin(&self, texture_id: &str) -> Result<RgbaImage, SkinError> {
        log::debug!("fetching skin texture {texture_id}");
        let response = ureq::get(&format!("{TEXTURE_BASE_URL}{texture_id}"))
            .call()
            .map_err(|e| SkinError::Network(e.to_string()))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| SkinError::Network(e.to_string()))?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Face and hat layer positions in the standard 64x64 skin layout.
const FACE_X: u32 = 8;
const FACE_Y: u32 = 8;
const HAT_X: u32 = 40;
const HAT_Y: u32 = 8;
const HEAD_SIZE: u32 = 8;

/// Render the flat head for a skin: the 8x8 face with the hat layer on top,
/// upscaled by `scale`.
pub fn render_head(skin: &RgbaImage, scale: u32) -> RgbaImage {
    let mut head = crop(skin, FACE_X, FACE_Y, HEAD_SIZE, HEAD_SIZE);
    let hat = crop(skin, HAT_X, HAT_Y, HEAD_SIZE, HEAD_SIZE);
    composite_over(&mut head, &hat);
    upscale(&head, scale.max(1))
}

fn crop(img: &RgbaImage, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |dx, dy| {
        let (sx, sy) = (x + dx, y + dy);
        if sx < img.width() && sy < img.height() {
            *img.get_pixel(sx, sy)
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}
