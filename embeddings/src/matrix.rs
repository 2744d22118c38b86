//! Matrix validation and the serializer interface shared by both encodings.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::error::{EmbeddingError, Result};
use crate::npy::NpyWriter;
use crate::pipeline::EmbeddingResult;
use crate::raw::RawF32Writer;

/// Dimensions of a validated matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixShape {
    pub rows: usize,
    pub columns: usize,
}

impl MatrixShape {
    /// Payload size in bytes (`rows * columns * 4`).
    pub fn payload_len(&self) -> usize {
        self.rows * self.columns * std::mem::size_of::<f32>()
    }
}

/// Check that every row has the width of the first one.
///
/// An empty input yields a `0 x 0` shape.
pub fn validate_rows<'a, I>(rows: I) -> Result<MatrixShape>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut count = 0;
    let mut expected = None;

    for (row, values) in rows.into_iter().enumerate() {
        let width = *expected.get_or_insert(values.len());
        if values.len() != width {
            return Err(EmbeddingError::RaggedMatrix {
                row,
                expected: width,
                actual: values.len(),
            });
        }
        count += 1;
    }

    Ok(MatrixShape {
        rows: count,
        columns: expected.unwrap_or(0),
    })
}

/// Writes an [`EmbeddingResult`] as a matrix file.
pub trait MatrixSerializer {
    /// Encoding produced by this serializer.
    fn format(&self) -> OutputFormat;

    /// Validate the result in memory. Nothing touches disk.
    fn validate(&self, result: &EmbeddingResult) -> Result<MatrixShape>;

    /// Write a result that already passed [`MatrixSerializer::validate`].
    fn write_validated(
        &self,
        path: &Path,
        result: &EmbeddingResult,
        shape: MatrixShape,
    ) -> Result<()>;

    /// Validate, then write. Returns the written shape.
    fn write(&self, path: &Path, result: &EmbeddingResult) -> Result<MatrixShape> {
        let shape = self.validate(result)?;
        self.write_validated(path, result, shape)?;
        Ok(shape)
    }
}

/// Serializer for the configured format.
pub fn serializer_for(format: OutputFormat) -> Box<dyn MatrixSerializer> {
    match format {
        OutputFormat::Npy => Box::new(NpyWriter),
        OutputFormat::RawF32 => Box::new(RawF32Writer),
    }
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| EmbeddingError::write(parent, e))
        }
        _ => Ok(()),
    }
}

/// Create (or truncate) `path` and hand a buffered writer to `body`.
pub(crate) fn write_file<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    create_parent_dir(path)?;
    let file = File::create(path).map_err(|e| EmbeddingError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| EmbeddingError::write(path, e))
}

/// Write every row as little-endian f32, row-major.
pub(crate) fn write_payload<W: Write>(writer: &mut W, result: &EmbeddingResult) -> io::Result<()> {
    for row in result.embeddings() {
        for value in row {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    Ok(())
}
