use crate::encoding::domain::face_encoder::EncodeError;
use crate::shared::frame::Frame;

/// Decodes an encoded image (JPEG, PNG, WebP, ...) into an RGB [`Frame`].
///
/// The format is sniffed from the bytes; the caller never declares it.
pub fn decode_rgb(bytes: &[u8]) -> Result<Frame, EncodeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| EncodeError::Decode(e.to_string()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Frame::new(img.into_raw(), width, height)
        .ok_or_else(|| EncodeError::Decode(format!("empty image ({width}x{height})")))
}
