//! Image resizing with the `image` crate.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;
use taste_core::fetch::{FetchError, ImageResizer};

/// Crops to fill `width`×`height`, keeping the source encoding when it is
/// writable and falling back to JPEG otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateResizer;

/// Decode, resize-to-fill and re-encode.
pub fn resize_to_fill(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FetchError> {
    let format = image::guess_format(bytes).map_err(|e| FetchError::Resize(e.to_string()))?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|e| FetchError::Resize(e.to_string()))?;
    let resized = decoded.resize_to_fill(width, height, FilterType::Lanczos3);

    let output = match format {
        ImageFormat::Png | ImageFormat::Jpeg => format,
        _ => ImageFormat::Jpeg,
    };
    let resized = if output == ImageFormat::Jpeg {
        image::DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, output)
        .map_err(|e| FetchError::Resize(e.to_string()))?;
    Ok(out.into_inner())
}

#[async_trait]
impl ImageResizer for ImageCrateResizer {
    async fn resize(&self, bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, FetchError> {
        tokio::task::spawn_blocking(move || resize_to_fill(&bytes, width, height))
            .await
            .map_err(|e| FetchError::Resize(format!("resize task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn encoded(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_resize_to_thumbnail_dimensions() {
        let src = encoded(ImageFormat::Png, 320, 240);
        let thumb = resize_to_fill(&src, 84, 84).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.dimensions(), (84, 84));
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_resize_keeps_jpeg() {
        let src = encoded(ImageFormat::Jpeg, 100, 300);
        let thumb = resize_to_fill(&src, 84, 84).unwrap();
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_resize_rejects_garbage() {
        assert!(matches!(
            resize_to_fill(b"definitely not an image", 84, 84),
            Err(FetchError::Resize(_))
        ));
    }

    #[tokio::test]
    async fn test_async_resize_runs_off_thread() {
        let src = encoded(ImageFormat::Png, 50, 50);
        let thumb = ImageCrateResizer.resize(src, 10, 20).await.unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.dimensions(), (10, 20));
    }
}
