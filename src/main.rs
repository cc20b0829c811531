//! fanout - concurrent fan-out/join aggregation
//!
//! A console program that dispatches simulated lookups to concurrent
//! tasks, collects their results under a mutex, joins on a completion
//! barrier and prints what happened. Alongside the aggregator it runs a
//! sequential baseline, channel sections and an error-path section.
//!
//! Exit codes:
//!   0 - Success (sections reporting failed units still count as success)
//!   1 - Runtime error (invalid flags, unreadable config, unwritable output)

mod aggregator;
mod cli;
mod config;
mod demo;
mod error;
mod lookup;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{RunMetadata, RunReport};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, Level};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("fanout v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .fanout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize ids, delays, sections and datasets.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so that stdout only carries the run output.
fn init_logging(args: &Args) {
    let subscriber = build_subscriber(args.log_level(), std::io::stderr);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn build_subscriber<W>(
    level: Level,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish()
}

/// Run the configured sections and print the summary.
async fn run(args: Args) -> Result<()> {
    let started_at = Utc::now();
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    println!("🚀 Running {} sections", config.demo.sections.len());
    println!("   Ids: {:?}", config.demo.ids);
    println!("   Max lookup delay: {}ms", config.lookup.max_delay_ms);
    if let Some(timeout) = config.lookup.unit_timeout_ms {
        println!("   Unit timeout: {}ms", timeout);
    }
    println!("   Failure policy: {:?}", config.lookup.failure_policy);

    let sections = demo::run_sections(&config).await;

    let run_report = RunReport {
        metadata: RunMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        sections,
    };

    match args.output {
        Some(ref path) => {
            report::write_report(&run_report, args.format, path)?;
            println!("\n✅ Done! Summary saved to: {}", path.display());
        }
        None => {
            println!("\n{}", report::render(&run_report, args.format)?);
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    load_config_in(args, Path::new("."))
}

/// Load the explicit config file, else `.fanout.toml` in `dir`, else defaults.
///
/// A config file that exists but does not parse is an error.
fn load_config_in(args: &Args, dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_from_dir(dir)? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["fanout"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_in(&args(&[]), dir.path()).unwrap();
        assert_eq!(config.lookup.max_delay_ms, 2000);
    }

    #[test]
    fn test_load_config_reads_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[lookup]\nmax_delay_ms = 7\n",
        )
        .unwrap();

        let config = load_config_in(&args(&[]), dir.path()).unwrap();
        assert_eq!(config.lookup.max_delay_ms, 7);
    }

    #[test]
    fn test_load_config_fails_on_malformed_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[lookup]\nmax_delay_ms = \"soon\"\n",
        )
        .unwrap();

        let err = load_config_in(&args(&[]), dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_lines_go_to_the_configured_writer() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = build_subscriber(Level::INFO, move || sink.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!("section started");
            debug!("hidden at info level");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("section started"));
        assert!(!output.contains("hidden at info level"));
    }
}
