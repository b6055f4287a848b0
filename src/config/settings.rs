//! Configuration settings for CopyBench
//!
//! Defines the CLI arguments, the JSON harness configuration and its
//! defaults.

use crate::core::Strategy;
use crate::error::{CopyBenchError, Result};
use crate::fs::BUNDLED_ASSETS;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sample input shipped in the bundled asset root
pub const DEFAULT_INPUT: &str = "alice.txt";

/// Output written by the default run
pub const DEFAULT_OUTPUT: &str = "output.txt";

/// CopyBench - compare file copy strategies
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "copybench")]
#[command(author = "CopyBench Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Time several strategies for copying one file to another")]
#[command(long_about = r#"
CopyBench copies one input file to an output file with several strategies
and prints how long each one took.

Strategies:
  single                 one byte per read and write
  block:<SIZE>           byte array of SIZE (e.g. block:4K)
  buffered_chars         buffered UTF-8 reader/writer, one character at a time
  buffered_block:<SIZE>  buffered UTF-8 reader/writer, SIZE characters at a time

Examples:
  copybench                                       # Classic six-strategy run
  copybench -i big.bin -o /tmp/out.bin -s block:64K -s single
  copybench --config bench.json --format json
"#)]
pub struct CliArgs {
    /// JSON configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Input resource name (path or name under an asset root)
    #[arg(short = 'i', long, value_name = "NAME")]
    pub input: Option<String>,

    /// Output file path
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<String>,

    /// Asset root searched for inputs (repeatable, searched in order)
    #[arg(long = "asset-root", value_name = "DIR")]
    pub asset_roots: Vec<PathBuf>,

    /// Strategy to time (repeatable, run in order)
    #[arg(short = 's', long = "strategy", value_name = "STRATEGY")]
    pub strategies: Vec<Strategy>,

    /// Run the whole task list this many times
    #[arg(short = 'r', long, value_name = "NUM")]
    pub repeat: Option<usize>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Verbose logging on stderr (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// CSV format
    Csv,
}

/// Harness configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Input resource name
    pub input_name: String,
    /// Output path
    pub output_name: String,
    /// Strategies, timed in order
    pub strategies: Vec<Strategy>,
    /// Asset roots searched after the direct path
    pub asset_roots: Vec<PathBuf>,
    /// Rounds over the whole task list
    pub repeat: usize,
    /// Report format
    pub format: OutputFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            input_name: DEFAULT_INPUT.to_string(),
            output_name: DEFAULT_OUTPUT.to_string(),
            strategies: Strategy::standard_set(),
            asset_roots: vec![PathBuf::from(BUNDLED_ASSETS)],
            repeat: 1,
            format: OutputFormat::Text,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CopyBenchError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Build configuration from CLI arguments, layered over a config file if given
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(input) = &args.input {
            config.input_name = input.clone();
        }
        if let Some(output) = &args.output {
            config.output_name = output.clone();
        }
        if !args.asset_roots.is_empty() {
            config.asset_roots = args.asset_roots.clone();
        }
        if !args.strategies.is_empty() {
            config.strategies = args.strategies.clone();
        }
        if let Some(repeat) = args.repeat {
            config.repeat = repeat;
        }
        if let Some(format) = args.format {
            config.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the harness cannot start with.
    ///
    /// Strategy parameters are not checked here: a bad block size fails its
    /// own task, not the whole run.
    pub fn validate(&self) -> Result<()> {
        if self.input_name.trim().is_empty() {
            return Err(CopyBenchError::config("input_name must not be empty"));
        }
        if self.output_name.trim().is_empty() {
            return Err(CopyBenchError::config("output_name must not be empty"));
        }
        if self.repeat == 0 {
            return Err(CopyBenchError::config("repeat must be at least 1"));
        }
        Ok(())
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid size: {}", size));
    }

    Ok((num * multiplier as f64) as u64)
}
