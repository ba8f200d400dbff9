//! Per-request render settings
//!
//! Values are clamped at construction so the rest of the renderer never has
//! to defend against out-of-band input.

use crate::markup::{clamp_line_length, DEFAULT_LINE_LENGTH};

/// Background alpha used when a request does not supply one.
pub const DEFAULT_ALPHA: u8 = 245;

/// Immutable knobs for a single tooltip render. Built once per request and
/// never mutated mid-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Wrap width in visible characters, clamped to the supported band.
    pub max_line_length: usize,
    /// Background opacity. Forced to opaque while animating.
    pub alpha: u8,
    /// Extra vertical pixels inserted after the first line.
    pub padding: u32,
    /// Draw the two-tone border ring around the background.
    pub render_border: bool,
    /// Center each line instead of left-aligning.
    pub center_text: bool,
    /// Integer upscale factor, at least 1.
    pub scale_factor: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_LINE_LENGTH,
            alpha: DEFAULT_ALPHA,
            padding: 0,
            render_border: true,
            center_text: false,
            scale_factor: 1,
        }
    }
}

impl RenderSettings {
    /// Build settings from raw request values, clamping each into range.
    pub fn new(
        max_line_length: usize,
        alpha: u8,
        padding: u32,
        render_border: bool,
        center_text: bool,
        scale_factor: u32,
    ) -> Self {
        Self {
            max_line_length: clamp_line_length(max_line_length),
            alpha,
            padding,
            render_border,
            center_text,
            scale_factor: scale_factor.max(1),
        }
    }

    pub fn with_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = clamp_line_length(max_line_length);
        self
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_border(mut self, render_border: bool) -> Self {
        self.render_border = render_border;
        self
    }

    pub fn with_centered_text(mut self, center_text: bool) -> Self {
        self.center_text = center_text;
        self
    }

    pub fn with_scale(mut self, scale_factor: u32) -> Self {
        self.scale_factor = scale_factor.max(1);
        self
    }

    /// Side length of one logical texel in output pixels.
    pub fn pixel_size(&self) -> u32 {
        2 * self.scale_factor
    }
}
