//! # Radar Embeddings
//!
//! This crate turns a directory of images into a dense `float32` matrix of
//! embeddings and writes it to disk together with the ordered source paths.
//!
//! ## Features
//!
//! - **Deterministic Scanning**: Recursive walk, extension filter, byte-order sort
//! - **Batched Inference**: Pluggable decoder and model behind narrow traits
//! - **Two Encodings**: Self-describing NPY or a raw `float32_le` blob
//! - **Sidecar Metadata**: JSON path list kept in lockstep with matrix rows
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embedding Export                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ImageScanner ──► EmbeddingPipeline ──► EmbeddingResult         │
//! │       │                 │                     │                 │
//! │       ▼                 ▼                     ▼                 │
//! │  ScanConfig    ImageLoader/Embedder   MatrixSerializer+Sidecar  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod matrix;
pub mod npy;
pub mod pipeline;
pub mod provider;
pub mod raw;
pub mod scan;
pub mod sidecar;
pub mod thumbnail;

pub use config::{ExportConfig, OutputFormat, ScanConfig, Submission};
pub use error::{BoxError, EmbeddingError, Result};
pub use export::{ExportSummary, Exporter, write_result};
pub use matrix::{MatrixSerializer, MatrixShape, serializer_for, validate_rows};
pub use npy::NpyWriter;
pub use pipeline::{EmbeddedImage, EmbeddingPipeline, EmbeddingResult};
pub use provider::{ImageCrateLoader, ImageEmbedder, ImageLoader};
pub use raw::RawF32Writer;
pub use scan::{ImageScanner, enumerate_images};
pub use sidecar::{SidecarMetadata, sidecar_path, write_sidecar};
pub use thumbnail::{Device, ThumbnailEmbedder};

pub use image::DynamicImage;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
