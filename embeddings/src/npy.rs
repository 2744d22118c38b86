//! NPY (format version 1.0) writer for `float32` matrices.
//!
//! Layout:
//!
//! ```text
//! \x93NUMPY | major=1 | minor=0 | header_len: u16 LE | header | payload
//! ```
//!
//! The header is a Python dict literal padded with spaces and terminated by a
//! newline so that the payload starts on a 16-byte boundary.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::OutputFormat;
use crate::error::{EmbeddingError, Result};
use crate::matrix::{MatrixSerializer, MatrixShape, validate_rows, write_file, write_payload};
use crate::pipeline::EmbeddingResult;

/// File magic.
pub const NPY_MAGIC: [u8; 6] = *b"\x93NUMPY";

/// Format version written (major, minor).
pub const NPY_VERSION: (u8, u8) = (1, 0);

/// Payload alignment required of the preamble.
pub const NPY_ALIGNMENT: usize = 16;

/// Magic + version + header length field.
const FIXED_PREAMBLE_LEN: usize = NPY_MAGIC.len() + 2 + 2;

/// Build the complete preamble (everything before the payload).
pub fn encode_preamble(shape: MatrixShape) -> Result<Vec<u8>> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        shape.rows, shape.columns
    );

    // +1 for the terminating newline.
    let unpadded = FIXED_PREAMBLE_LEN + dict.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    let header_len = dict.len() + padding + 1;
    let header_len_field =
        u16::try_from(header_len).map_err(|_| EmbeddingError::HeaderTooLong(header_len))?;

    let mut preamble = Vec::with_capacity(FIXED_PREAMBLE_LEN + header_len);
    preamble.extend_from_slice(&NPY_MAGIC);
    preamble.push(NPY_VERSION.0);
    preamble.push(NPY_VERSION.1);
    preamble.extend_from_slice(&header_len_field.to_le_bytes());
    preamble.extend_from_slice(dict.as_bytes());
    preamble.resize(preamble.len() + padding, b' ');
    preamble.push(b'\n');
    Ok(preamble)
}

/// Writes `.npy` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpyWriter;

impl MatrixSerializer for NpyWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Npy
    }

    fn validate(&self, result: &EmbeddingResult) -> Result<MatrixShape> {
        if result.is_empty() {
            return Err(EmbeddingError::EmptyMatrix);
        }
        validate_rows(result.embeddings())
    }

    fn write_validated(
        &self,
        path: &Path,
        result: &EmbeddingResult,
        shape: MatrixShape,
    ) -> Result<()> {
        let preamble = encode_preamble(shape)?;
        write_file(path, |writer| {
            writer.write_all(&preamble)?;
            write_payload(writer, result)
        })?;

        info!(
            "Wrote {}x{} npy matrix to {}",
            shape.rows,
            shape.columns,
            path.display()
        );
        Ok(())
    }
}
