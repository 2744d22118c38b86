//! End-to-end export: enumerate, embed, validate, write.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ExportConfig, OutputFormat};
use crate::error::{EmbeddingError, Result};
use crate::matrix::serializer_for;
use crate::pipeline::{EmbeddingPipeline, EmbeddingResult, ProgressFn};
use crate::provider::{ImageEmbedder, ImageLoader};
use crate::scan::ImageScanner;
use crate::sidecar::write_sidecar;

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Encoding of the matrix file.
    pub format: OutputFormat,

    /// Number of rows written.
    pub rows: usize,

    /// Number of columns written.
    pub columns: usize,

    /// Matrix file path.
    pub matrix_path: PathBuf,

    /// Sidecar file path.
    pub sidecar_path: PathBuf,
}

/// Runs one export described by an [`ExportConfig`].
pub struct Exporter<'a> {
    config: ExportConfig,
    loader: &'a dyn ImageLoader,
    embedder: &'a dyn ImageEmbedder,
}

impl<'a> Exporter<'a> {
    /// Create an exporter.
    pub fn new(
        config: ExportConfig,
        loader: &'a dyn ImageLoader,
        embedder: &'a dyn ImageEmbedder,
    ) -> Self {
        Self {
            config,
            loader,
            embedder,
        }
    }

    /// The configuration this exporter runs with.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Enumerate the input, failing if nothing matched.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>> {
        let paths = ImageScanner::new(self.config.scan.clone()).scan(&self.config.input)?;
        if paths.is_empty() {
            return Err(EmbeddingError::EmptyInput(self.config.input.clone()));
        }
        Ok(paths)
    }

    /// Run the export.
    pub fn run(&self) -> Result<ExportSummary> {
        self.run_with_progress(&mut |_, _| {})
    }

    /// Run the export, reporting `(completed, total)` after every batch.
    pub fn run_with_progress(&self, progress: &mut ProgressFn<'_>) -> Result<ExportSummary> {
        let batch_size = self.config.validate()?;
        let paths = self.collect_paths()?;

        let result = EmbeddingPipeline::new(self.loader, self.embedder, batch_size)
            .with_submission(self.config.submission)
            .run_with_progress(&paths, progress)?;

        write_result(self.config.format, &self.config.output_path(), result)
    }
}

/// Write `result` as a matrix plus sidecar.
///
/// The result is validated once, in memory, before either file is opened, so
/// a ragged or empty result leaves nothing on disk.
pub fn write_result(
    format: OutputFormat,
    matrix_path: &Path,
    result: EmbeddingResult,
) -> Result<ExportSummary> {
    let serializer = serializer_for(format);
    let shape = serializer.validate(&result)?;

    serializer.write_validated(matrix_path, &result, shape)?;
    let sidecar_path = write_sidecar(format, matrix_path, &result)?;

    info!(
        "Exported {} embeddings ({} columns) to {} with metadata {}",
        shape.rows,
        shape.columns,
        matrix_path.display(),
        sidecar_path.display()
    );

    Ok(ExportSummary {
        format,
        rows: shape.rows,
        columns: shape.columns,
        matrix_path: matrix_path.to_path_buf(),
        sidecar_path,
    })
}
