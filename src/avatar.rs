//! Avatar intake: buffering, format checks and normalisation.
//!
//! Every check runs on the fully buffered upload before anything is written, and the
//! stored blob is always a square PNG of the configured dimension.

use actix_multipart::Multipart;
use futures::TryStreamExt;
use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;

use crate::error::AppError;

/// Multipart field carrying the image.
pub const AVATAR_FIELD: &str = "avatar";

/// Content type of every stored avatar.
pub const AVATAR_CONTENT_TYPE: &str = "image/png";

lazy_static! {
    static ref ALLOWED_FILENAME: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

#[derive(Debug, Clone, Copy)]
pub struct AvatarPolicy {
    pub max_bytes: usize,
    pub dimension: u32,
}

/// Reads the `avatar` field into memory, enforcing the byte limit while streaming.
/// Other fields are drained and ignored.
pub async fn read_upload(
    mut payload: Multipart,
    policy: AvatarPolicy,
) -> Result<Vec<u8>, AppError> {
    let mut upload = None;
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != AVATAR_FIELD || upload.is_some() {
            while field.try_next().await?.is_some() {}
            continue;
        }
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        if !ALLOWED_FILENAME.is_match(&filename) {
            return Err(AppError::UnsupportedMediaType(
                "Please upload a jpg, jpeg or png image".into(),
            ));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > policy.max_bytes {
                return Err(AppError::PayloadTooLarge(policy.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(bytes);
    }
    upload.ok_or_else(|| AppError::UnsupportedMediaType("Please upload an image".into()))
}

/// Decodes, cover-crops to a `dimension` square and re-encodes as PNG.
///
/// CPU bound; callers run it on the blocking pool.
pub fn normalize(bytes: &[u8], dimension: u32) -> Result<Vec<u8>, AppError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) | Ok(ImageFormat::Jpeg) => {}
        _ => {
            return Err(AppError::UnsupportedMediaType(
                "File is not a jpg or png image".into(),
            ))
        }
    }
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AppError::UnsupportedMediaType(format!("Unreadable image: {}", e)))?;
    let resized = decoded.resize_to_fill(dimension, dimension, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode avatar: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_normalize_produces_square_png() {
        let source = encoded(400, 120, ImageFormat::Jpeg);
        let normalized = normalize(&source, 250).unwrap();

        assert_eq!(image::guess_format(&normalized).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&normalized).unwrap();
        assert_eq!(decoded.dimensions(), (250, 250));
    }

    #[test]
    fn test_normalize_rejects_non_images() {
        assert!(matches!(
            normalize(b"definitely not an image", 250),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_filename_filter() {
        assert!(ALLOWED_FILENAME.is_match("profile-pic.jpg"));
        assert!(ALLOWED_FILENAME.is_match("me.JPEG"));
        assert!(ALLOWED_FILENAME.is_match("me.png"));
        assert!(!ALLOWED_FILENAME.is_match("resume.pdf"));
        assert!(!ALLOWED_FILENAME.is_match("png"));
    }
}
