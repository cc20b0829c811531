//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values. Every flag is optional:
//! running without arguments executes all sections with defaults.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// fanout - concurrent fan-out/join aggregation demos
///
/// Dispatches simulated lookups to concurrent tasks, collects their
/// results under a mutex and joins on a completion barrier. Also runs
/// the sequential baseline, channel and error-path sections.
///
/// Examples:
///   fanout
///   fanout --sections concurrent,datasets --max-delay-ms 200
///   fanout --timeout-ms 500 --strict
///   fanout --format json --output run.json
///   fanout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .fanout.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bars)
    #[arg(short, long)]
    pub quiet: bool,

    /// Upper bound of the simulated lookup delay in milliseconds
    #[arg(long, value_name = "MS", env = "FANOUT_MAX_DELAY_MS")]
    pub max_delay_ms: Option<u64>,

    /// Per-unit time limit in milliseconds
    ///
    /// Units that exceed it are recorded as timed out.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Fail an aggregation if any of its units failed
    ///
    /// By default partial results are kept next to the failures.
    #[arg(long)]
    pub strict: bool,

    /// Sections to run (comma-separated)
    ///
    /// Example: --sections sequential,concurrent
    #[arg(long, value_name = "SECTIONS", value_delimiter = ',')]
    pub sections: Option<Vec<Section>>,

    /// Identifiers to look up (comma-separated)
    ///
    /// Example: --ids id1,id2,id3
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub ids: Option<Vec<String>>,

    /// Output format for the run summary (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the run summary to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Generate a default .fanout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

/// A runnable section.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Lookups one after another
    Sequential,
    /// Fan-out/join through the aggregator
    Concurrent,
    /// Fan-out/join logging the results after every append
    Snapshots,
    /// Independent aggregations per dataset, joined together
    Datasets,
    /// Producer/consumer over unbuffered and buffered channels
    Channels,
    /// First price deal wins
    Deals,
    /// Integer division and its error path
    Division,
}

impl Section {
    /// All sections in their default order.
    pub fn all() -> &'static [Section] {
        &[
            Section::Sequential,
            Section::Concurrent,
            Section::Snapshots,
            Section::Datasets,
            Section::Channels,
            Section::Deals,
            Section::Division,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Sequential => "sequential",
            Section::Concurrent => "concurrent",
            Section::Snapshots => "snapshots",
            Section::Datasets => "datasets",
            Section::Channels => "channels",
            Section::Deals => "deals",
            Section::Division => "division",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout_ms {
            if timeout == 0 {
                return Err("Timeout must be at least 1 millisecond".to_string());
            }
        }

        if let Some(ref sections) = self.sections {
            if sections.is_empty() {
                return Err("At least one section must be selected".to_string());
            }
        }

        if let Some(ref ids) = self.ids {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err("Identifiers must not be empty".to_string());
            }
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            max_delay_ms: None,
            timeout_ms: None,
            strict: false,
            sections: None,
            ids: None,
            format: OutputFormat::Text,
            output: None,
            init_config: false,
        }
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let args = Args::try_parse_from(["fanout"]).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.sections.is_none());
    }

    #[test]
    fn test_parse_sections_and_ids() {
        let args = Args::try_parse_from([
            "fanout",
            "--sections",
            "concurrent,division",
            "--ids",
            "a,b,c",
            "--strict",
        ])
        .unwrap();

        assert_eq!(
            args.sections,
            Some(vec![Section::Concurrent, Section::Division])
        );
        assert_eq!(args.ids.as_ref().map(|ids| ids.len()), Some(3));
        assert!(args.strict);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(Args::try_parse_from(["fanout", "--sections", "teleport"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout_ms = Some(0);
        assert!(args.validate().is_err());

        args.timeout_ms = Some(1);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_blank_id() {
        let mut args = make_args();
        args.ids = Some(vec!["id1".to_string(), " ".to_string()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_section_names_match_serde() {
        for section in Section::all() {
            let json = serde_json::to_string(section).unwrap();
            assert_eq!(json, format!("\"{}\"", section.name()));
        }
    }
}
