//! Headerless little-endian `float32` writer.
//!
//! The file is just the row-major payload. Row and column counts live in the
//! JSON sidecar written next to it.

use std::path::Path;

use tracing::info;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::matrix::{MatrixSerializer, MatrixShape, validate_rows, write_file, write_payload};
use crate::pipeline::EmbeddingResult;

/// Format tag recorded in the sidecar.
pub const RAW_FORMAT_TAG: &str = "float32_le";

/// Writes raw `float32_le` blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawF32Writer;

impl MatrixSerializer for RawF32Writer {
    fn format(&self) -> OutputFormat {
        OutputFormat::RawF32
    }

    /// Zero rows is valid here and yields an empty file.
    fn validate(&self, result: &EmbeddingResult) -> Result<MatrixShape> {
        validate_rows(result.embeddings())
    }

    fn write_validated(
        &self,
        path: &Path,
        result: &EmbeddingResult,
        shape: MatrixShape,
    ) -> Result<()> {
        write_file(path, |writer| write_payload(writer, result))?;

        info!(
            "Wrote {}x{} {RAW_FORMAT_TAG} matrix to {}",
            shape.rows,
            shape.columns,
            path.display()
        );
        Ok(())
    }
}
