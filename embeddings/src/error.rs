//! Error types for the embedding export system.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for embedding export operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Opaque error raised by an external collaborator (decoder or model).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while enumerating, embedding, or exporting images.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Input root does not exist.
    #[error("input path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Input root exists but contains no recognized images.
    #[error("no images found to embed in {}", .0.display())]
    EmptyInput(PathBuf),

    /// Zero rows handed to a writer that requires at least one.
    #[error("no embeddings to write")]
    EmptyMatrix,

    /// Rows of differing widths.
    #[error("inconsistent embedding dimensions: row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A model returned a vector whose width differs from its declared dimension.
    #[error("dimension mismatch for {}: expected {expected}, got {actual}", path.display())]
    DimensionMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Path and vector lists of different lengths.
    #[error("row count mismatch: {paths} paths but {embeddings} embeddings")]
    LengthMismatch { paths: usize, embeddings: usize },

    /// NPY header does not fit in the 16-bit length field.
    #[error("npy header too long: {0} bytes")]
    HeaderTooLong(usize),

    /// Image decoding failed.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Model inference failed.
    #[error("inference failed: {0}")]
    Inference(#[source] BoxError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing an output file failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbeddingError {
    /// Wrap an arbitrary model failure.
    pub fn inference(err: impl Into<BoxError>) -> Self {
        Self::Inference(err.into())
    }

    /// Wrap an arbitrary decoder failure for `path`.
    pub fn decode(path: impl Into<PathBuf>, err: impl Into<BoxError>) -> Self {
        Self::Decode {
            path: path.into(),
            source: err.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
