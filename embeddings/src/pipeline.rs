//! Batch orchestration: decode, embed, accumulate.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use crate::Embedding;
use crate::config::Submission;
use crate::error::{EmbeddingError, Result};
use crate::provider::{ImageEmbedder, ImageLoader};

/// One row of the output: a source image and its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// Source image path.
    pub path: PathBuf,

    /// Model output for the image.
    pub embedding: Embedding,
}

/// Ordered rows produced by one pipeline run.
///
/// Row `i` of the matrix and entry `i` of the sidecar path list are both read
/// from `rows[i]`, so the two files cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResult {
    rows: Vec<EmbeddedImage>,
}

impl EmbeddingResult {
    /// Create a result from `(path, vector)` rows.
    pub fn new(rows: Vec<EmbeddedImage>) -> Self {
        Self { rows }
    }

    /// Build a result from parallel path and vector lists.
    pub fn from_parts(paths: Vec<PathBuf>, embeddings: Vec<Embedding>) -> Result<Self> {
        if paths.len() != embeddings.len() {
            return Err(EmbeddingError::LengthMismatch {
                paths: paths.len(),
                embeddings: embeddings.len(),
            });
        }
        let rows = paths
            .into_iter()
            .zip(embeddings)
            .map(|(path, embedding)| EmbeddedImage { path, embedding })
            .collect();
        Ok(Self { rows })
    }

    /// Append a row.
    pub fn push(&mut self, path: impl Into<PathBuf>, embedding: Embedding) {
        self.rows.push(EmbeddedImage {
            path: path.into(),
            embedding,
        });
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the first row, if any.
    pub fn columns(&self) -> Option<usize> {
        self.rows.first().map(|row| row.embedding.len())
    }

    /// All rows in order.
    pub fn rows(&self) -> &[EmbeddedImage] {
        &self.rows
    }

    /// Source paths in row order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.rows.iter().map(|row| row.path.as_path())
    }

    /// Vectors in row order.
    pub fn embeddings(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(|row| row.embedding.as_slice())
    }
}

/// Callback invoked after every batch with `(completed, total)` image counts.
pub type ProgressFn<'a> = dyn FnMut(usize, usize) + 'a;

/// Drives decoding and inference over an ordered path list.
pub struct EmbeddingPipeline<'a> {
    loader: &'a dyn ImageLoader,
    embedder: &'a dyn ImageEmbedder,
    batch_size: NonZeroUsize,
    submission: Submission,
}

impl<'a> EmbeddingPipeline<'a> {
    /// Create a pipeline around a decoder and a model.
    pub fn new(
        loader: &'a dyn ImageLoader,
        embedder: &'a dyn ImageEmbedder,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            loader,
            embedder,
            batch_size,
            submission: Submission::Batch,
        }
    }

    /// Set the submission mode.
    pub fn with_submission(mut self, submission: Submission) -> Self {
        self.submission = submission;
        self
    }

    /// Embed every path, in order.
    pub fn run(&self, paths: &[PathBuf]) -> Result<EmbeddingResult> {
        self.run_with_progress(paths, &mut |_, _| {})
    }

    /// Embed every path, in order, reporting progress after each batch.
    ///
    /// The first decode or inference error aborts the run; no partial result
    /// is returned.
    pub fn run_with_progress(
        &self,
        paths: &[PathBuf],
        progress: &mut ProgressFn<'_>,
    ) -> Result<EmbeddingResult> {
        let start = Instant::now();
        let total = paths.len();
        let mut result = EmbeddingResult {
            rows: Vec::with_capacity(total),
        };

        for (index, batch) in paths.chunks(self.batch_size.get()).enumerate() {
            let images = batch
                .iter()
                .map(|path| self.loader.load(path))
                .collect::<Result<Vec<DynamicImage>>>()?;

            let vectors = match self.submission {
                Submission::Batch => self.embedder.embed_batch(&images)?,
                Submission::Single => images
                    .iter()
                    .map(|image| self.embedder.embed(image))
                    .collect::<Result<Vec<Embedding>>>()?,
            };

            if vectors.len() != batch.len() {
                return Err(EmbeddingError::inference(format!(
                    "model {} returned {} vectors for {} images",
                    self.embedder.name(),
                    vectors.len(),
                    batch.len()
                )));
            }

            let dimension = self.embedder.dimension();
            for (path, embedding) in batch.iter().zip(vectors) {
                if embedding.len() != dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        path: path.clone(),
                        expected: dimension,
                        actual: embedding.len(),
                    });
                }
                result.push(path.clone(), embedding);
            }

            debug!("Embedded batch {} ({} images)", index + 1, batch.len());
            progress(result.len(), total);
        }

        info!(
            "Embedded {} images with {} in {:?}",
            result.len(),
            self.embedder.name(),
            start.elapsed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Decodes nothing; encodes the path length as the image width.
    struct FakeLoader;

    impl ImageLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<DynamicImage> {
            if path.to_string_lossy().contains("corrupt") {
                return Err(EmbeddingError::decode(path, "bad header"));
            }
            let width = path.to_string_lossy().len() as u32;
            Ok(DynamicImage::new_rgb8(width, 1))
        }
    }

    /// Returns `[width]` per image and records batch sizes.
    #[derive(Default)]
    struct RecordingEmbedder {
        batches: RefCell<Vec<usize>>,
        singles: RefCell<usize>,
        drop_last: bool,
        declared: Option<usize>,
    }

    impl ImageEmbedder for RecordingEmbedder {
        fn name(&self) -> &str {
            "recording"
        }

        fn dimension(&self) -> usize {
            self.declared.unwrap_or(1)
        }

        fn embed(&self, image: &DynamicImage) -> Result<Embedding> {
            *self.singles.borrow_mut() += 1;
            Ok(vec![image.width() as f32])
        }

        fn embed_batch(&self, images: &[DynamicImage]) -> Result<Vec<Embedding>> {
            self.batches.borrow_mut().push(images.len());
            let mut out: Vec<Embedding> =
                images.iter().map(|i| vec![i.width() as f32]).collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_batches_preserve_order() {
        let embedder = RecordingEmbedder::default();
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(2));
        let input = paths(&["a", "bb", "ccc", "dddd", "eeeee"]);

        let result = pipeline.run(&input).unwrap();

        assert_eq!(*embedder.batches.borrow(), vec![2, 2, 1]);
        assert_eq!(
            result.paths().collect::<Vec<_>>(),
            input.iter().map(PathBuf::as_path).collect::<Vec<_>>()
        );
        assert_eq!(
            result.embeddings().map(|e| e[0]).collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(result.columns(), Some(1));
    }

    #[test]
    fn test_single_submission() {
        let embedder = RecordingEmbedder::default();
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(4))
            .with_submission(Submission::Single);

        let result = pipeline.run(&paths(&["a", "bb", "ccc"])).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(*embedder.singles.borrow(), 3);
        assert!(embedder.batches.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_paths_produce_duplicate_rows() {
        let embedder = RecordingEmbedder::default();
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(16));

        let result = pipeline.run(&paths(&["same", "same"])).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.rows()[0], result.rows()[1]);
    }

    #[test]
    fn test_decode_failure_aborts_run() {
        let embedder = RecordingEmbedder::default();
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(1));

        let err = pipeline
            .run(&paths(&["ok", "corrupt.png", "never"]))
            .unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::Decode { ref path, .. } if path == Path::new("corrupt.png")
        ));
        assert_eq!(*embedder.batches.borrow(), vec![1]);
    }

    #[test]
    fn test_short_batch_is_inference_error() {
        let embedder = RecordingEmbedder {
            drop_last: true,
            ..Default::default()
        };
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(3));

        let err = pipeline.run(&paths(&["a", "b"])).unwrap_err();
        assert!(matches!(err, EmbeddingError::Inference(_)));
    }

    #[test]
    fn test_width_must_match_declared_dimension() {
        let embedder = RecordingEmbedder {
            declared: Some(2),
            ..Default::default()
        };
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(4));

        let err = pipeline.run(&paths(&["a", "bb"])).unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { ref path, expected: 2, actual: 1 }
                if path == Path::new("a")
        ));
    }

    #[test]
    fn test_progress_reports_each_batch() {
        let embedder = RecordingEmbedder::default();
        let pipeline = EmbeddingPipeline::new(&FakeLoader, &embedder, size(2));
        let mut seen = Vec::new();

        pipeline
            .run_with_progress(&paths(&["a", "b", "c"]), &mut |done, total| {
                seen.push((done, total));
            })
            .unwrap();

        assert_eq!(seen, vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn test_from_parts_length_mismatch() {
        let err = EmbeddingResult::from_parts(paths(&["a", "b"]), vec![vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::LengthMismatch {
                paths: 2,
                embeddings: 1
            }
        ));
    }
}
