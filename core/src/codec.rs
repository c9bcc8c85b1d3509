use std::fmt;
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};

use crate::*;

pub const THUMBNAIL_PREFIX: &str = "data:image/png;base64,";

/// Encoded image of one cell, an opaque data URI as far as the store is concerned.
///
/// The payload is reference counted: the wall clones it into every render of its cell.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Thumbnail(Rc<str>);

impl Thumbnail {
    /// Wraps a value read from the store. No validation happens, other viewers may have written anything.
    pub fn from_store(value: impl Into<Rc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn shared(&self) -> Rc<str> {
        self.0.clone()
    }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(32).collect();
        write!(f, "Thumbnail({:?}.., {} bytes)", head, self.0.len())
    }
}

/// Decodes any supported image and re-encodes it as a `size` x `size` PNG data URI.
///
/// The aspect ratio is not preserved: the source is stretched to fill the square.
pub fn encode_thumbnail(bytes: &[u8], size: u32) -> core::result::Result<Thumbnail, CodecError> {
    if size == 0 {
        return Err(CodecError::Dimensions);
    }

    let image =
        image::load_from_memory(bytes).map_err(|err| CodecError::Decode(err.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::Dimensions);
    }

    let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgba8();

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(resized.as_raw(), size, size, ExtendedColorType::Rgba8)
        .map_err(|err| CodecError::Encode(err.to_string()))?;

    log::debug!(
        "thumbnail {}x{} -> {}x{}, {} png bytes",
        image.width(),
        image.height(),
        size,
        size,
        png.len()
    );

    let mut uri = String::with_capacity(THUMBNAIL_PREFIX.len() + png.len().div_ceil(3) * 4);
    uri.push_str(THUMBNAIL_PREFIX);
    STANDARD.encode_string(&png, &mut uri);
    Ok(Thumbnail(uri.into()))
}
