//! Request value types
//!
//! One plain value type per product. Each knows how to serialize every
//! field that affects output pixels into a deterministic fingerprint, which
//! becomes the cache key. Serialization is explicit and length-prefixed so
//! adjacent fields can never collide by concatenation.

use crate::cache::cache_key;
use crate::settings::RenderSettings;

/// Explicit field-by-field serializer backing the fingerprints.
struct FieldWriter {
    tag: &'static str,
    buf: String,
}

impl FieldWriter {
    fn new(tag: &'static str) -> Self {
        Self { tag, buf: String::new() }
    }

    fn field(&mut self, name: &str, value: &str) -> &mut Self {
        use std::fmt::Write;
        let _ = write!(self.buf, "{name}={}:{value};", value.len());
        self
    }

    fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        self.field(name, if value { "1" } else { "0" })
    }

    fn number(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.field(name, &value.to_string())
    }

    fn finish(&self) -> String {
        cache_key(self.tag, &self.buf)
    }
}

fn settings_fields(f: &mut FieldWriter, s: &RenderSettings) {
    f.number("max_line_length", s.max_line_length)
        .number("alpha", s.alpha)
        .number("padding", s.padding)
        .flag("render_border", s.render_border)
        .flag("center_text", s.center_text)
        .number("scale_factor", s.scale_factor);
}

/// A tooltip render: markup text plus panel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipRequest {
    pub text: String,
    pub settings: RenderSettings,
}

impl TooltipRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), settings: RenderSettings::default() }
    }

    pub fn fingerprint(&self) -> String {
        let mut f = FieldWriter::new("tooltip");
        f.field("text", &self.text);
        settings_fields(&mut f, &self.settings);
        f.finish()
    }
}

/// An item sprite render with its effect flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpriteRequest {
    pub item: String,
    /// Overlay color option, forwarded to the overlay's resolution chain.
    pub color_option: Option<String>,
    pub enchanted: bool,
    pub hovered: bool,
    pub durability: Option<u8>,
    pub scale: u32,
}

impl ItemSpriteRequest {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            color_option: None,
            enchanted: false,
            hovered: false,
            durability: None,
            scale: 1,
        }
    }

    pub fn fingerprint(&self) -> String {
        let mut f = FieldWriter::new("sprite");
        f.field("item", &self.item)
            .field("color", self.color_option.as_deref().unwrap_or(""))
            .flag("enchanted", self.enchanted)
            .flag("hovered", self.hovered)
            .field(
                "durability",
                &self.durability.map(|d| d.to_string()).unwrap_or_default(),
            )
            .number("scale", self.scale);
        f.finish()
    }
}

/// A recipe grid render from the raw recipe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRequest {
    pub recipe: String,
    /// Optional label drawn above the grid.
    pub title: Option<String>,
    pub scale: u32,
}

impl RecipeRequest {
    pub fn new(recipe: impl Into<String>) -> Self {
        Self { recipe: recipe.into(), title: None, scale: 2 }
    }

    pub fn fingerprint(&self) -> String {
        let mut f = FieldWriter::new("recipe");
        f.field("recipe", &self.recipe)
            .field("title", self.title.as_deref().unwrap_or(""))
            .number("scale", self.scale);
        f.finish()
    }
}

/// A player head render from a name, hash, blob or texture URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHeadRequest {
    pub texture: String,
    pub scale: u32,
}

impl PlayerHeadRequest {
    pub fn new(texture: impl Into<String>) -> Self {
        Self { texture: texture.into(), scale: 8 }
    }

    pub fn fingerprint(&self) -> String {
        let mut f = FieldWriter::new("head");
        f.field("texture", &self.texture).number("scale", self.scale);
        f.finish()
    }
}
