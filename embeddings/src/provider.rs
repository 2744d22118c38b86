//! Collaborator seams: image decoding and model inference.
//!
//! The export pipeline never talks to a decoder or model directly. It goes
//! through [`ImageLoader`] and [`ImageEmbedder`], so tests can swap in
//! deterministic stubs.

use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Decodes an image file into a pixel buffer.
pub trait ImageLoader {
    /// Decode the image at `path`.
    fn load(&self, path: &Path) -> Result<DynamicImage>;
}

/// A model that turns decoded images into fixed-length vectors.
pub trait ImageEmbedder {
    /// Get the name of this embedder.
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a single image.
    fn embed(&self, image: &DynamicImage) -> Result<Embedding>;

    /// Embed several images, returning vectors in submission order.
    fn embed_batch(&self, images: &[DynamicImage]) -> Result<Vec<Embedding>> {
        // Default implementation: process sequentially
        images.iter().map(|image| self.embed(image)).collect()
    }
}

/// Decoder backed by the `image` crate (PNG, JPEG, TIFF).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateLoader;

impl ImageLoader for ImageCrateLoader {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        // Sniff the format from the file header so a directly named file
        // decodes whatever its extension.
        let image = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| EmbeddingError::decode(path, e))?
            .decode()
            .map_err(|e| EmbeddingError::decode(path, e))?;
        debug!(
            "Decoded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct SumEmbedder;

    impl ImageEmbedder for SumEmbedder {
        fn name(&self) -> &str {
            "sum"
        }

        fn dimension(&self) -> usize {
            1
        }

        fn embed(&self, image: &DynamicImage) -> Result<Embedding> {
            let total: u32 = image.to_rgb8().pixels().map(|p| u32::from(p[0])).sum();
            Ok(vec![total as f32])
        }
    }

    #[test]
    fn test_default_batch_preserves_order() {
        let images: Vec<DynamicImage> = [1u8, 2, 3]
            .iter()
            .map(|v| DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([*v, 0, 0]))))
            .collect();

        let vectors = SumEmbedder.embed_batch(&images).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[test]
    fn test_image_crate_loader_decodes_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("radar.png");
        RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let image = ImageCrateLoader.load(&path).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(image.to_rgb8().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_image_crate_loader_reports_decode_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        match ImageCrateLoader.load(&path) {
            Err(EmbeddingError::Decode { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
