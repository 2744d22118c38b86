//! Built-in CPU embedder.
//!
//! Runs the standard ImageNet preprocessing (shorter side to 256, center crop
//! to 224, scale to `[0, 1]`, per-channel mean/std normalization) and then
//! average-pools the normalized tensor onto a coarse grid. The result is a
//! deterministic, channel-major `3 * grid * grid` vector.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::ImageEmbedder;

/// Shorter side after the first resize.
const RESIZE_SHORTER: u32 = 256;

/// Side of the square center crop.
const CROP_SIZE: u32 = 224;

/// ImageNet channel means.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Default pooling grid (8x8 cells, 192 columns).
pub const DEFAULT_GRID: u32 = 8;

/// Compute device requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

impl Device {
    /// Interpret a device selector. `cuda*` and `gpu*` select the GPU,
    /// anything else the CPU.
    pub fn from_selector(selector: &str) -> Self {
        let normalized = selector.trim().to_ascii_lowercase();
        if normalized.starts_with("cuda") || normalized.starts_with("gpu") {
            Self::Gpu
        } else {
            Self::Cpu
        }
    }
}

/// Pooled-thumbnail embedder.
#[derive(Debug, Clone)]
pub struct ThumbnailEmbedder {
    grid: u32,
}

impl ThumbnailEmbedder {
    /// Create an embedder for the given device selector.
    pub fn new(device: &str) -> Self {
        if Device::from_selector(device) == Device::Gpu {
            warn!("Device {device:?} requested but the thumbnail embedder runs on CPU");
        }
        Self { grid: DEFAULT_GRID }
    }

    /// Set the pooling grid side (1 to 224).
    pub fn with_grid(mut self, grid: u32) -> Result<Self> {
        if grid == 0 || grid > CROP_SIZE {
            return Err(EmbeddingError::Config(format!(
                "pooling grid must be between 1 and {CROP_SIZE}, got {grid}"
            )));
        }
        self.grid = grid;
        Ok(self)
    }

    fn preprocess(&self, image: &DynamicImage) -> Result<image::RgbImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(EmbeddingError::inference(format!(
                "cannot embed an empty {width}x{height} image"
            )));
        }

        let scale = |long: u32, short: u32| {
            let scaled = u64::from(long) * u64::from(RESIZE_SHORTER) / u64::from(short);
            u32::try_from(scaled).unwrap_or(u32::MAX).max(RESIZE_SHORTER)
        };
        let (new_width, new_height) = if width <= height {
            (RESIZE_SHORTER, scale(height, width))
        } else {
            (scale(width, height), RESIZE_SHORTER)
        };

        let resized = image.resize_exact(new_width, new_height, FilterType::Triangle);
        let left = (new_width - CROP_SIZE) / 2;
        let top = (new_height - CROP_SIZE) / 2;
        Ok(resized.crop_imm(left, top, CROP_SIZE, CROP_SIZE).to_rgb8())
    }
}

impl Default for ThumbnailEmbedder {
    fn default() -> Self {
        Self { grid: DEFAULT_GRID }
    }
}

impl ImageEmbedder for ThumbnailEmbedder {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn dimension(&self) -> usize {
        let cells = self.grid as usize * self.grid as usize;
        cells * 3
    }

    fn embed(&self, image: &DynamicImage) -> Result<Embedding> {
        let rgb = self.preprocess(image)?;
        let grid = self.grid as usize;
        let cells = grid * grid;

        let mut sums = vec![0.0f64; cells * 3];
        let mut counts = vec![0u32; cells];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let cx = x as usize * grid / CROP_SIZE as usize;
            let cy = y as usize * grid / CROP_SIZE as usize;
            let cell = cy * grid + cx;
            counts[cell] += 1;
            for channel in 0..3 {
                let value = f32::from(pixel[channel]) / 255.0;
                let normalized = (value - MEAN[channel]) / STD[channel];
                sums[channel * cells + cell] += f64::from(normalized);
            }
        }

        let embedding: Embedding = sums
            .iter()
            .enumerate()
            .map(|(i, sum)| (sum / f64::from(counts[i % cells].max(1))) as f32)
            .collect();

        debug!("Pooled {}x{} grid into {} values", grid, grid, embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_device_selector() {
        assert_eq!(Device::from_selector("cpu"), Device::Cpu);
        assert_eq!(Device::from_selector("CUDA:0"), Device::Gpu);
        assert_eq!(Device::from_selector("gpu"), Device::Gpu);
        assert_eq!(Device::from_selector("mps"), Device::Cpu);
    }

    #[test]
    fn test_dimension_matches_output() {
        let embedder = ThumbnailEmbedder::new("cpu");
        let vector = embedder.embed(&solid(300, 200, [0, 0, 0])).unwrap();

        assert_eq!(embedder.dimension(), 192);
        assert_eq!(vector.len(), 192);
    }

    #[test]
    fn test_solid_image_normalizes_per_channel() {
        let embedder = ThumbnailEmbedder::new("cpu").with_grid(2).unwrap();
        let vector = embedder.embed(&solid(64, 96, [255, 0, 128])).unwrap();

        assert_eq!(vector.len(), 12);
        let expected = [
            (1.0 - MEAN[0]) / STD[0],
            (0.0 - MEAN[1]) / STD[1],
            (128.0 / 255.0 - MEAN[2]) / STD[2],
        ];
        for (i, value) in vector.iter().enumerate() {
            let want = expected[i / 4];
            assert!(
                (value - want).abs() < 0.02,
                "value {i} was {value}, expected {want}"
            );
        }
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let mut image = RgbImage::new(40, 30);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 6) as u8, (y * 8) as u8, 77]);
        }
        let image = DynamicImage::ImageRgb8(image);
        let embedder = ThumbnailEmbedder::default();

        assert_eq!(embedder.embed(&image).unwrap(), embedder.embed(&image).unwrap());
    }

    #[test]
    fn test_left_and_right_halves_differ() {
        let mut image = RgbImage::from_pixel(256, 256, Rgb([0, 0, 0]));
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            if x >= 128 {
                *pixel = Rgb([255, 255, 255]);
            }
        }
        let embedder = ThumbnailEmbedder::default().with_grid(2).unwrap();
        let vector = embedder.embed(&DynamicImage::ImageRgb8(image)).unwrap();

        // Red channel: cells (0,0) and (0,1) sit on opposite halves.
        assert!(vector[0] < 0.0);
        assert!(vector[1] > 0.0);
    }

    #[test]
    fn test_rejects_invalid_grid() {
        assert!(ThumbnailEmbedder::default().with_grid(0).is_err());
        assert!(ThumbnailEmbedder::default().with_grid(225).is_err());
    }
}
