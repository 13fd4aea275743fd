use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use shared::EncodedImage;

use crate::config::ImageIntakeConfig;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Unsupported image type: {0}")]
    InvalidFormat(String),
    #[error("Image is {actual} bytes, limit is {limit} bytes")]
    SizeExceeded { actual: usize, limit: usize },
    #[error("Failed to decode image: {0}")]
    DecodeError(String),
}

/// Normalize an uploaded photo into a size-bounded JPEG data URL.
///
/// The claimed MIME type and byte size are checked before any decoding
/// work happens. Photos larger than the configured pixel bound are
/// downsampled preserving aspect ratio.
pub fn process_upload(
    data: &[u8],
    file_name: &str,
    claimed_mime: &str,
    config: &ImageIntakeConfig,
) -> Result<EncodedImage, IntakeError> {
    if !config.accepted_types.iter().any(|t| t == claimed_mime) {
        return Err(IntakeError::InvalidFormat(claimed_mime.to_string()));
    }
    if data.len() > config.max_bytes {
        return Err(IntakeError::SizeExceeded {
            actual: data.len(),
            limit: config.max_bytes,
        });
    }

    let decoded = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| IntakeError::DecodeError(e.to_string()))?
        .decode()
        .map_err(|e| IntakeError::DecodeError(e.to_string()))?;

    let bounded =
        if decoded.width() > config.max_dimension || decoded.height() > config.max_dimension {
            decoded.thumbnail(config.max_dimension, config.max_dimension)
        } else {
            decoded
        };

    // JPEG has no alpha channel.
    let rgb = bounded.to_rgb8();
    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(
        &mut jpeg,
        config.jpeg_quality,
    ))
    .map_err(|e| IntakeError::DecodeError(e.to_string()))?;

    let payload = base64::engine::general_purpose::STANDARD.encode(&jpeg);

    Ok(EncodedImage {
        data_url: format!("data:image/jpeg;base64,{}", payload),
        file_name: file_name.to_string(),
        byte_size: data.len() as i64,
        mime_type: claimed_mime.to_string(),
        width: rgb.width(),
        height: rgb.height(),
    })
}
