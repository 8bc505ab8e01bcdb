use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

use crate::publishing::domain::publish_error::PublishError;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
const JPEG_QUALITY: u8 = 90;

/// Decodes any supported image format and re-encodes it as baseline RGB JPEG.
pub fn reencode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, PublishError> {
    let rgb = image::load_from_memory(bytes)
        .map_err(|e| PublishError::Reencode(e.to_string()))?
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| PublishError::Reencode(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(16, 12, image::Rgb([200, 100, 50]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_png_becomes_jpeg() {
        let jpeg = reencode_jpeg(&png_bytes()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 12);
    }

    #[test]
    fn test_undecodable_input_is_permanent_error() {
        let err = reencode_jpeg(b"nope").unwrap_err();
        assert!(matches!(err, PublishError::Reencode(_)));
        assert!(!err.is_transient());
    }
}
