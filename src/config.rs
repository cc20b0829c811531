//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fanout.toml` files.

use crate::aggregator::{AggregatorOptions, FailurePolicy};
use crate::cli::Section;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".fanout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Lookup and aggregation settings.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Which sections run and on what input.
    #[serde(default)]
    pub demo: DemoConfig,

    /// Producer/consumer channel settings.
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Price watcher race settings.
    #[serde(default)]
    pub deals: DealConfig,

    /// Named in-memory tables served by the dataset lookup (id -> value).
    #[serde(default = "default_datasets")]
    pub datasets: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            lookup: LookupConfig::default(),
            demo: DemoConfig::default(),
            channels: ChannelConfig::default(),
            deals: DealConfig::default(),
            datasets: default_datasets(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Show progress bars for parallel aggregations.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Upper bound of the simulated lookup delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-unit time limit in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_timeout_ms: Option<u64>,

    /// What to do when some units fail.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Log the collected results after every append.
    #[serde(default = "default_true")]
    pub log_snapshots: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: default_max_delay_ms(),
            unit_timeout_ms: None,
            failure_policy: FailurePolicy::default(),
            log_snapshots: true,
        }
    }
}

fn default_max_delay_ms() -> u64 {
    2000
}

impl LookupConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn unit_timeout(&self) -> Option<Duration> {
        self.unit_timeout_ms.map(Duration::from_millis)
    }

    /// Aggregator options for this configuration.
    pub fn aggregator_options(&self, log_snapshots: bool) -> AggregatorOptions {
        AggregatorOptions {
            unit_timeout: self.unit_timeout(),
            policy: self.failure_policy,
            log_snapshots: log_snapshots && self.log_snapshots,
        }
    }
}

/// Section selection and inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Identifiers looked up by the sequential and concurrent sections.
    #[serde(default = "default_ids")]
    pub ids: Vec<String>,

    /// Sections to run, in order.
    #[serde(default = "default_sections")]
    pub sections: Vec<Section>,

    /// Numerator for the division section.
    #[serde(default = "default_dividend")]
    pub dividend: i64,

    /// Denominator for the division section.
    #[serde(default = "default_divisor")]
    pub divisor: i64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ids: default_ids(),
            sections: default_sections(),
            dividend: default_dividend(),
            divisor: default_divisor(),
        }
    }
}

fn default_dividend() -> i64 {
    100
}

fn default_divisor() -> i64 {
    50
}

fn default_ids() -> Vec<String> {
    (1..=5).map(|i| format!("id{}", i)).collect()
}

fn default_sections() -> Vec<Section> {
    Section::all().to_vec()
}

/// Producer/consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Number of values the producer sends.
    #[serde(default = "default_message_count")]
    pub message_count: usize,

    /// Capacity of the buffered channel.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Simulated work per value received from the buffered channel.
    #[serde(default = "default_consumer_work_ms")]
    pub consumer_work_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            message_count: default_message_count(),
            buffer_size: default_buffer_size(),
            consumer_work_ms: default_consumer_work_ms(),
        }
    }
}

fn default_message_count() -> usize {
    5
}

fn default_buffer_size() -> usize {
    5
}

fn default_consumer_work_ms() -> u64 {
    1000
}

/// Price watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealConfig {
    /// Websites to watch; one chicken and one tofu watcher each.
    #[serde(default = "default_websites")]
    pub websites: Vec<String>,

    /// A chicken price at or below this is a deal.
    #[serde(default = "default_max_chicken_price")]
    pub max_chicken_price: f32,

    /// A tofu price at or below this is a deal.
    #[serde(default = "default_max_tofu_price")]
    pub max_tofu_price: f32,

    /// Upper bound of the simulated price.
    #[serde(default = "default_price_ceiling")]
    pub price_ceiling: f32,

    /// Delay between two price checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Stop waiting for a deal after this long.
    #[serde(default = "default_give_up_after_ms")]
    pub give_up_after_ms: u64,
}

impl Default for DealConfig {
    fn default() -> Self {
        Self {
            websites: default_websites(),
            max_chicken_price: default_max_chicken_price(),
            max_tofu_price: default_max_tofu_price(),
            price_ceiling: default_price_ceiling(),
            poll_interval_ms: default_poll_interval_ms(),
            give_up_after_ms: default_give_up_after_ms(),
        }
    }
}

fn default_websites() -> Vec<String> {
    vec!["walmart.com", "costco.com", "wholefoods.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_chicken_price() -> f32 {
    5.0
}

fn default_max_tofu_price() -> f32 {
    3.0
}

fn default_price_ceiling() -> f32 {
    20.0
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_give_up_after_ms() -> u64 {
    30_000
}

fn default_datasets() -> BTreeMap<String, BTreeMap<String, String>> {
    let table = |suffix: fn(usize) -> String| -> BTreeMap<String, String> {
        (1..=5).map(|i| (format!("id{}", i), suffix(i))).collect()
    };

    let mut datasets = BTreeMap::new();
    datasets.insert("primary".to_string(), table(|i| format!("id{}", i)));
    datasets.insert("replica".to_string(), table(|i| format!("id{}.{}", i, i)));
    datasets.insert("archive".to_string(), table(|i| format!("id{}.{}{}", i, i, i)));
    datasets
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.fanout.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(max_delay_ms) = args.max_delay_ms {
            self.lookup.max_delay_ms = max_delay_ms;
        }

        if let Some(timeout_ms) = args.timeout_ms {
            self.lookup.unit_timeout_ms = Some(timeout_ms);
        }

        if args.strict {
            self.lookup.failure_policy = FailurePolicy::Strict;
        }

        if let Some(ref sections) = args.sections {
            self.demo.sections = sections.clone();
        }

        if let Some(ref ids) = args.ids {
            self.demo.ids = ids.clone();
        }

        if args.quiet {
            self.general.show_progress = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
