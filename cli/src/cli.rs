//! Command-line definition for the `radar-embed` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use radar_embeddings::{ExportConfig, OutputFormat, Submission};

/// Convert Doppler radar images into embeddings for generative models.
#[derive(Debug, Parser)]
#[command(name = "radar-embed", version, about, long_about = None)]
pub struct Cli {
    /// Path to a radar image or directory of images.
    pub input: Option<PathBuf>,

    /// Output matrix path (metadata is saved alongside as .json).
    /// Defaults to embeddings.npy, or embeddings.bin with --format raw.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Number of images per batch.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Device to run inference on (cpu or cuda).
    #[arg(long)]
    pub device: Option<String>,

    /// Matrix encoding.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Submit images to the model one at a time instead of per batch.
    #[arg(long)]
    pub single: bool,

    /// Pooling grid side of the built-in embedder (columns = 3 * grid^2).
    #[arg(long, default_value_t = radar_embeddings::thumbnail::DEFAULT_GRID)]
    pub grid: u32,

    /// TOML file with export settings; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Suppress progress output and all logs except errors.
    #[arg(long, short)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Matrix encodings selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Self-describing NPY array.
    Npy,
    /// Raw little-endian float32 blob.
    Raw,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Npy => OutputFormat::Npy,
            FormatArg::Raw => OutputFormat::RawF32,
        }
    }
}

impl Cli {
    /// Log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            _ if self.quiet => "error",
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Build the export config: file values first, then flags.
    pub fn export_config(&self) -> anyhow::Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_toml_file(path)?,
            None => ExportConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if self.single {
            config.submission = Submission::Single;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["radar-embed", "scans"]);
        let config = cli.export_config().unwrap();

        assert_eq!(config.input, PathBuf::from("scans"));
        assert_eq!(config.output_path(), PathBuf::from("embeddings.npy"));
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.submission, Submission::Batch);
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::parse_from([
            "radar-embed",
            "scans",
            "--output",
            "out/vectors.bin",
            "--batch-size",
            "4",
            "--device",
            "cuda",
            "--format",
            "raw",
            "--single",
            "-vv",
        ]);
        let config = cli.export_config().unwrap();

        assert_eq!(config.output_path(), PathBuf::from("out/vectors.bin"));
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.device, "cuda");
        assert_eq!(config.format, OutputFormat::RawF32);
        assert_eq!(config.submission, Submission::Single);
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_raw_default_output() {
        let cli = Cli::parse_from(["radar-embed", "scans", "--format", "raw"]);
        let config = cli.export_config().unwrap();

        assert_eq!(config.output_path(), PathBuf::from("embeddings.bin"));
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("radar.toml");
        std::fs::write(&path, "input = \"from-file\"\nbatch_size = 32\ndevice = \"gpu\"\n").unwrap();

        let cli = Cli::parse_from([
            "radar-embed",
            "--config",
            path.to_str().unwrap(),
            "--batch-size",
            "2",
        ]);
        let config = cli.export_config().unwrap();

        assert_eq!(config.input, PathBuf::from("from-file"));
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.device, "gpu");
    }

    #[test]
    fn test_quiet_wins() {
        let cli = Cli::parse_from(["radar-embed", "scans", "-q", "-v"]);
        assert_eq!(cli.log_filter(), "error");
    }
}
