//! Transport codec for client-submitted images.
//!
//! Clients send images as base64 strings, usually with a browser data-URL
//! prefix (`data:image/jpeg;base64,...`). Decoding strips the prefix and
//! yields a full raster image or an error — never a partial image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

/// JPEG quality for stored enrollment photos.
const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unparseable image bytes: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a transport-encoded image payload into a raster image.
///
/// Accepts a bare base64 string or a data URL; anything up to and including
/// a `base64,` marker is stripped before decoding.
pub fn decode_image(payload: &str) -> Result<DynamicImage, DecodeError> {
    let raw = match payload.split_once("base64,") {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = STANDARD.decode(raw.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Encode an image as a base64 data URL in the given format.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<String, DecodeError> {
    let mut cursor = Cursor::new(Vec::new());
    match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => image.to_rgb8().write_to(&mut cursor, format)?,
        _ => image.write_to(&mut cursor, format)?,
    }
    let encoded = STANDARD.encode(cursor.get_ref());
    Ok(format!("data:{};base64,{}", format.to_mime_type(), encoded))
}

/// Encode an image as raw JPEG bytes — the storage form of an enrollment
/// photo.
pub fn to_jpeg_bytes(image: &DynamicImage) -> Result<Vec<u8>, DecodeError> {
    let rgb = image.to_rgb8();
    let mut cursor = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(cursor.into_inner())
}
