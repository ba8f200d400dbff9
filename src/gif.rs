//! Frame encoding
//!
//! Turns a [`FrameSet`] into PNG (still) or GIF (animated) bytes, with
//! file-writing helpers on top. GIF delays are centisecond-quantized with a
//! floor of one centisecond so very fast animations do not freeze in viewers
//! that treat a zero delay as "as fast as possible".

use crate::effect::FrameSet;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Frame, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encoded output plus the file extension it should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Encode a frame set: still images become PNG, animations become an
/// infinitely looping GIF.
pub fn encode(frames: &FrameSet) -> Result<EncodedImage, EncodeError> {
    match frames {
        FrameSet::Single(img) => Ok(EncodedImage { bytes: png_bytes(img)?, extension: "png" }),
        FrameSet::Animated { frames, delay_ms } => Ok(EncodedImage {
            bytes: gif_bytes(frames, *delay_ms, true)?,
            extension: "gif",
        }),
    }
}

pub fn png_bytes(img: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
    Ok(bytes)
}

pub fn gif_bytes(
    frames: &[RgbaImage],
    delay_ms: u32,
    loop_anim: bool,
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    encode_gif(&mut bytes, frames, delay_ms, loop_anim)?;
    Ok(bytes)
}

/// Write a frame sequence as an animated GIF file, creating parent
/// directories as needed.
pub fn write_gif(
    frames: &[RgbaImage],
    delay_ms: u32,
    loop_anim: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    if frames.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    encode_gif(writer, frames, delay_ms, loop_anim)
}

fn encode_gif<W: std::io::Write>(
    writer: W,
    frames: &[RgbaImage],
    delay_ms: u32,
    loop_anim: bool,
) -> Result<(), EncodeError> {
    let mut encoder = GifEncoder::new(writer);

    let repeat = if loop_anim {
        Repeat::Infinite
    } else {
        Repeat::Finite(0)
    };
    encoder.set_repeat(repeat)?;

    // GIF delays are centiseconds; floor at 1 so the animation never stalls
    let delay_cs = (delay_ms / 10).max(1);

    for rgba_image in frames {
        let delay = image::Delay::from_numer_denom_ms(delay_cs * 10, 1);
        let frame = Frame::from_parts(rgba_image.clone(), 0, 0, delay);
        encoder.encode_frame(frame)?;
    }

    Ok(())
}
