//! Runnable sections.
//!
//! Each section prints its progress to stdout and returns a
//! [`SectionReport`] for the run summary.

pub mod channels;
pub mod database;
pub mod division;

use crate::cli::Section;
use crate::config::{Config, DealConfig};
use crate::lookup::{Announced, SimulatedLookup};
use crate::models::{ExecutionMode, SectionReport};
use channels::DealWatch;
use std::time::{Duration, Instant};
use tracing::{info, warn};

impl From<&DealConfig> for DealWatch {
    fn from(config: &DealConfig) -> Self {
        Self {
            websites: config.websites.clone(),
            max_chicken_price: config.max_chicken_price,
            max_tofu_price: config.max_tofu_price,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            give_up_after: Duration::from_millis(config.give_up_after_ms),
            prices: channels::random_prices(config.price_ceiling),
        }
    }
}

/// Runs every configured section in order.
pub async fn run_sections(config: &Config) -> Vec<SectionReport> {
    let mut reports = Vec::with_capacity(config.demo.sections.len());

    for &section in &config.demo.sections {
        println!("\n▶ {}", section.name());
        info!("Running section {}", section.name());

        let report = run_section(section, config).await;
        if let Some(ref e) = report.error {
            warn!("Section {} failed: {}", report.name, e);
            println!("   ❌ {}", e);
        }
        reports.push(report);
    }

    reports
}

/// Runs a single section and records its duration.
pub async fn run_section(section: Section, config: &Config) -> SectionReport {
    let started = Instant::now();
    let max_delay = config.lookup.max_delay();
    let ids = &config.demo.ids;

    let mut report = match section {
        Section::Sequential => {
            let lookup = Announced::new(SimulatedLookup::new(max_delay));
            database::run_sequential(&lookup, ids).await
        }
        Section::Concurrent => {
            let lookup = Announced::new(SimulatedLookup::new(max_delay));
            database::run_concurrent(lookup, ids, config.lookup.aggregator_options(false)).await
        }
        Section::Snapshots => {
            let lookup = SimulatedLookup::new(max_delay);
            database::run_concurrent(lookup, ids, config.lookup.aggregator_options(true)).await
        }
        Section::Datasets => {
            database::run_datasets(
                &config.datasets,
                max_delay,
                config.lookup.aggregator_options(false),
                config.general.show_progress,
            )
            .await
        }
        Section::Channels => run_channels(config).await,
        Section::Deals => run_deals(&config.deals).await,
        Section::Division => run_division(config.demo.dividend, config.demo.divisor),
    };

    report.duration_ms = started.elapsed().as_millis() as u64;
    report
}

async fn run_channels(config: &Config) -> SectionReport {
    let settings = &config.channels;
    let mut report = SectionReport::new("channels", ExecutionMode::Channel);
    report.inputs = settings.message_count * 2;

    println!("   Unbuffered channel");
    let unbuffered = channels::relay(settings.message_count, 1, Duration::ZERO).await;

    println!("   Buffered channel (capacity {})", settings.buffer_size);
    let buffered = channels::relay(
        settings.message_count,
        settings.buffer_size,
        Duration::from_millis(settings.consumer_work_ms),
    )
    .await;

    report.results = unbuffered
        .iter()
        .chain(buffered.iter())
        .map(|v| v.to_string())
        .collect();
    report
}

async fn run_deals(config: &DealConfig) -> SectionReport {
    let mut report = SectionReport::new("deals", ExecutionMode::Channel);
    report.inputs = config.websites.len() * 2;

    match channels::find_first_deal(&DealWatch::from(config)).await {
        Some(deal) => {
            println!("   Found a deal on {} at {}", deal.product, deal.website);
            report.results.push(format!("{}@{}", deal.product, deal.website));
        }
        None => println!("   No deal found"),
    }

    report
}

fn run_division(numerator: i64, denominator: i64) -> SectionReport {
    let mut report = SectionReport::new("division", ExecutionMode::Direct);
    report.inputs = 1;

    let (outcome, lines) = division::describe(numerator, denominator);
    for line in &lines {
        println!("   {}", line);
    }

    // The error path is part of the demonstration, not a section failure.
    if let Err(e) = outcome {
        info!("Division fell back to the default branch: {}", e);
    }

    report.results = lines;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.lookup.max_delay_ms = 1;
        config.channels.consumer_work_ms = 0;
        config.deals.poll_interval_ms = 1;
        config.deals.price_ceiling = 1.0;
        config.general.show_progress = false;
        config
    }

    #[tokio::test]
    async fn test_run_all_sections() {
        let config = fast_config();
        let reports = run_sections(&config).await;

        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "sequential",
                "concurrent",
                "snapshots",
                "datasets",
                "channels",
                "deals",
                "division"
            ]
        );
        assert!(reports.iter().all(|r| r.succeeded()));
    }

    #[tokio::test]
    async fn test_channels_section() {
        let mut config = fast_config();
        config.channels.message_count = 3;

        let report = run_section(Section::Channels, &config).await;
        assert_eq!(report.inputs, 6);
        assert_eq!(report.results, vec!["0", "1", "2", "0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_deals_section_finds_a_deal() {
        // A price ceiling of 1.0 keeps every price under both maximums.
        let report = run_section(Section::Deals, &fast_config()).await;
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].contains('@'));
    }

    #[test]
    fn test_division_section_error_path() {
        let report = run_division(10, 0);
        assert!(report.succeeded());
        assert_eq!(report.results[0], "Error: can't divide by zero");
    }

    #[test]
    fn test_deal_watch_from_config() {
        let watch = DealWatch::from(&DealConfig::default());
        assert_eq!(watch.websites.len(), 3);
        assert_eq!(watch.poll_interval, Duration::from_secs(1));
        assert_eq!(watch.max_tofu_price, 3.0);
    }
}
