use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::warn;
use uuid::Uuid;

pub mod s3;

pub use s3::S3MediaStore;

/// Uploaded images larger than this are downscaled, preserving aspect.
pub const MAX_WIDTH: u32 = 1200;
pub const MAX_HEIGHT: u32 = 800;

const JPEG_QUALITY: u8 = 85;

/// Fixed logical prefix every image lives under.
pub const KEY_PREFIX: &str = "events/";

/// Image storage behind the bucket. Failures are swallowed into
/// `None`/`false`/empty results with a diagnostic log; callers treat a
/// falsy result as a generic service failure for that call.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, data: Bytes, original_name: &str, content_type: &str) -> Option<String>;
    async fn delete(&self, url: &str) -> bool;
    async fn list(&self) -> Vec<String>;
}

/// Collision-resistant storage key: timestamp plus random id under the
/// fixed prefix, keeping the original extension.
pub(crate) fn storage_key(original_name: &str, now: DateTime<Utc>) -> String {
    let extension = original_name
        .rfind('.')
        .map(|i| original_name[i..].to_lowercase())
        .unwrap_or_default();
    format!(
        "{KEY_PREFIX}{}_{}{extension}",
        now.format("%Y%m%d_%H%M%S"),
        Uuid::new_v4()
    )
}

/// Storage key for a previously issued public URL: the final path segment
/// under the fixed prefix.
pub(crate) fn key_from_url(url: &str) -> Option<String> {
    let name = url.rsplit('/').next()?;
    if name.is_empty() {
        return None;
    }
    Some(format!("{KEY_PREFIX}{name}"))
}

/// Normalizes an upload: downscale to the bounds when oversized (Lanczos3),
/// force RGB, re-encode as baseline JPEG at quality 85. On any imaging
/// error the original bytes are uploaded unchanged.
pub(crate) fn prepare_upload(data: Bytes) -> Bytes {
    match normalize_image(&data) {
        Ok(normalized) => Bytes::from(normalized),
        Err(err) => {
            warn!(error = %err, "image normalization failed, uploading original bytes");
            data
        }
    }
}

fn normalize_image(data: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = decoded.dimensions();

    let bounded = if width > MAX_WIDTH || height > MAX_HEIGHT {
        decoded.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Lanczos3)
    } else {
        decoded
    };

    let rgb = DynamicImage::ImageRgb8(bounded.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::RgbaImage;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        Bytes::from(out.into_inner())
    }

    #[test]
    fn storage_keys_carry_prefix_timestamp_and_extension() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let key = storage_key("Band Photo.PNG", now);
        assert!(key.starts_with("events/20260314_150926_"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn storage_keys_do_not_collide() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let a = storage_key("poster.jpg", now);
        let b = storage_key("poster.jpg", now);
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_recovered_from_public_url() {
        assert_eq!(
            key_from_url("http://localhost:9000/gatepass-images/events/20260314_150926_abc.jpg"),
            Some("events/20260314_150926_abc.jpg".to_string())
        );
        assert_eq!(key_from_url(""), None);
    }

    #[test]
    fn oversized_image_is_downscaled_within_bounds() {
        let normalized = normalize_image(&png_bytes(2000, 1500)).unwrap();
        let decoded = image::load_from_memory(&normalized).unwrap();
        let (width, height) = decoded.dimensions();
        assert!(width <= MAX_WIDTH && height <= MAX_HEIGHT);
        // Aspect ratio of 4:3 survives within rounding.
        let ratio = f64::from(width) / f64::from(height);
        assert!((ratio - 2000.0 / 1500.0).abs() < 0.01);
    }

    #[test]
    fn in_bounds_image_keeps_dimensions_but_is_jpeg_normalized() {
        let normalized = normalize_image(&png_bytes(640, 480)).unwrap();
        let decoded = image::load_from_memory(&normalized).unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));
        assert_eq!(
            image::guess_format(&normalized).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn undecodable_payload_falls_back_to_original_bytes() {
        let garbage = Bytes::from_static(b"definitely not an image");
        assert_eq!(prepare_upload(garbage.clone()), garbage);
    }
}
