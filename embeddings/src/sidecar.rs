//! JSON metadata written next to the matrix file.
//!
//! The two encodings name their sidecar differently:
//!
//! - NPY: the matrix extension is replaced (`out/emb.npy` → `out/emb.json`).
//! - Raw: `.json` is appended to the full name (`out/emb.bin` →
//!   `out/emb.bin.json`).

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::matrix::write_file;
use crate::pipeline::EmbeddingResult;
use crate::raw::RAW_FORMAT_TAG;

/// Sidecar document.
///
/// NPY sidecars only carry `paths`, since the matrix header already records
/// dtype and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarMetadata {
    /// Payload encoding tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_format: Option<String>,

    /// File name of the matrix this sidecar describes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Number of matrix rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,

    /// Number of matrix columns (0 when there are no rows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,

    /// Source image of each row, in row order.
    pub paths: Vec<String>,
}

impl SidecarMetadata {
    /// Build the sidecar for `result` written to `matrix_path` as `format`.
    pub fn new(format: OutputFormat, matrix_path: &Path, result: &EmbeddingResult) -> Self {
        let paths = result
            .paths()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        match format {
            OutputFormat::Npy => Self {
                embedding_format: None,
                output: None,
                rows: None,
                columns: None,
                paths,
            },
            OutputFormat::RawF32 => Self {
                embedding_format: Some(RAW_FORMAT_TAG.to_string()),
                output: matrix_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()),
                rows: Some(result.len()),
                columns: Some(result.columns().unwrap_or(0)),
                paths,
            },
        }
    }

    /// Read a sidecar back from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Where the sidecar for `matrix_path` lives.
pub fn sidecar_path(format: OutputFormat, matrix_path: &Path) -> PathBuf {
    match format {
        OutputFormat::Npy => matrix_path.with_extension("json"),
        OutputFormat::RawF32 => {
            let mut name = matrix_path
                .file_name()
                .map(OsString::from)
                .unwrap_or_default();
            name.push(".json");
            matrix_path.with_file_name(name)
        }
    }
}

/// Write the sidecar for `result` and return its path.
///
/// Must be given the same result that was written to `matrix_path`.
pub fn write_sidecar(
    format: OutputFormat,
    matrix_path: &Path,
    result: &EmbeddingResult,
) -> Result<PathBuf> {
    let path = sidecar_path(format, matrix_path);
    let metadata = SidecarMetadata::new(format, matrix_path, result);
    let json = serde_json::to_vec_pretty(&metadata)?;

    write_file(&path, |writer| writer.write_all(&json))?;

    debug!("Wrote sidecar with {} paths to {}", metadata.paths.len(), path.display());
    Ok(path)
}
