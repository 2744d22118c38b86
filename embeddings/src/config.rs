//! Configuration types for embedding export.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Default number of images submitted to the model per call.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Default device selector handed to the model client.
pub const DEFAULT_DEVICE: &str = "cpu";

/// Image extensions recognized when scanning a directory.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".tif", ".tiff"];

/// Configuration for one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Image file or directory of images.
    pub input: PathBuf,

    /// Matrix file to write (None = format default).
    pub output: Option<PathBuf>,

    /// Images per model call.
    pub batch_size: usize,

    /// Device selector, passed through to the model client.
    pub device: String,

    /// On-disk matrix encoding.
    pub format: OutputFormat,

    /// How images are submitted to the model.
    pub submission: Submission,

    /// Directory scanning options.
    pub scan: ScanConfig,
}

impl ExportConfig {
    /// Create a new export config for `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Load a config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmbeddingError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| EmbeddingError::Config(format!("{}: {e}", path.display())))
    }

    /// Set the input path.
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the output path.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the device selector.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the submission mode.
    pub fn with_submission(mut self, submission: Submission) -> Self {
        self.submission = submission;
        self
    }

    /// Set the scanning options.
    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// The matrix path this config writes to.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_output()))
    }

    /// Check the config and return the batch size as a non-zero value.
    pub fn validate(&self) -> Result<NonZeroUsize> {
        if self.input.as_os_str().is_empty() {
            return Err(EmbeddingError::Config("input path is required".to_string()));
        }
        if self.scan.extensions.is_empty() {
            return Err(EmbeddingError::Config(
                "at least one image extension is required".to_string(),
            ));
        }
        NonZeroUsize::new(self.batch_size).ok_or_else(|| {
            EmbeddingError::Config("batch size must be a positive integer".to_string())
        })
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            batch_size: DEFAULT_BATCH_SIZE,
            device: DEFAULT_DEVICE.to_string(),
            format: OutputFormat::default(),
            submission: Submission::default(),
            scan: ScanConfig::default(),
        }
    }
}

/// On-disk encoding of the embedding matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Self-describing NPY array, sidecar `<stem>.json`.
    #[default]
    Npy,

    /// Headerless little-endian f32 blob, sidecar `<name>.json`.
    RawF32,
}

impl OutputFormat {
    /// Output file used when none is configured.
    pub fn default_output(self) -> &'static str {
        match self {
            Self::Npy => "embeddings.npy",
            Self::RawF32 => "embeddings.bin",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npy => write!(f, "npy"),
            Self::RawF32 => write!(f, "raw_f32"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "npy" => Ok(Self::Npy),
            "raw" | "raw_f32" | "bin" => Ok(Self::RawF32),
            other => Err(EmbeddingError::Config(format!(
                "unknown output format: {other} (expected npy or raw)"
            ))),
        }
    }
}

/// How decoded images are handed to the model client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// One `embed_batch` call per batch.
    #[default]
    Batch,

    /// One `embed` call per image.
    Single,
}

/// Options for directory scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Lowercase file-name suffixes to keep, including the leading dot.
    pub extensions: Vec<String>,

    /// Whether to follow symbolic links while walking.
    pub follow_symlinks: bool,
}

impl ScanConfig {
    /// Replace the extension set.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Enable following symbolic links.
    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Check whether a file name carries a recognized extension.
    ///
    /// Both sides are compared lowercased, so extensions loaded from a config
    /// file match regardless of case.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_ascii_lowercase()))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            follow_symlinks: false,
        }
    }
}
