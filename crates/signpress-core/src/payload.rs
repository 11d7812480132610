//! Signature payload handling
//!
//! Payloads arrive as base64 strings captured from a canvas, often still
//! carrying their `data:image/png;base64,` header. This module strips
//! and decodes them, then re-encodes the raster as a PDF Image XObject
//! ready to be referenced from page content.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};

use crate::error::ComposeError;

/// Strip a data-URI header: everything up to and including the first `,`.
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    }
}

/// Decode a stored payload into raw image bytes.
///
/// A payload that is present but undecodable is corruption rather than a
/// benign missing signature, so the error aborts the whole composition.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, ComposeError> {
    let b64 = strip_data_uri(payload.trim());
    BASE64
        .decode(b64)
        .map_err(|e| ComposeError::PayloadDecode(format!("invalid base64: {}", e)))
}

/// A decoded raster, re-encoded as PDF stream objects.
///
/// `stream` is the Image XObject (DeviceRGB, 8 bpc, FlateDecode); when
/// the raster carries meaningful alpha, `smask` holds the DeviceGray
/// soft mask the compositor wires in via `/SMask`.
pub struct RasterImage {
    pub stream: Stream,
    pub smask: Option<Stream>,
    pub width: u32,
    pub height: u32,
}

/// Decode raw image bytes (PNG, JPEG, ...) into a [`RasterImage`].
pub fn raster_xobject(bytes: &[u8]) -> Result<RasterImage, ComposeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ComposeError::PayloadDecode(format!("undecodable raster image: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let raw = rgba.into_raw();

    // Separate color and alpha channels
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for px in raw.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }
    let has_alpha = alpha.iter().any(|&a| a < 255);

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let stream = Stream::new(dict, deflate(&rgb)?);

    let smask = if has_alpha {
        let mut sdict = Dictionary::new();
        sdict.set("Type", Object::Name(b"XObject".to_vec()));
        sdict.set("Subtype", Object::Name(b"Image".to_vec()));
        sdict.set("Width", Object::Integer(width as i64));
        sdict.set("Height", Object::Integer(height as i64));
        sdict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        sdict.set("BitsPerComponent", Object::Integer(8));
        sdict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        Some(Stream::new(sdict, deflate(&alpha)?))
    } else {
        None
    };

    Ok(RasterImage {
        stream,
        smask,
        width,
        height,
    })
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ComposeError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ComposeError::Unclassified(format!("stream compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ComposeError::Unclassified(format!("stream compression failed: {}", e)))
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([180, 40, 40, alpha]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}
