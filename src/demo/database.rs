//! Simulated database calls: sequential baseline, fan-out/join and
//! independent aggregations per dataset.

use crate::aggregator::{Aggregator, AggregatorOptions};
use crate::lookup::{DatasetLookup, Lookup};
use crate::models::{ExecutionMode, SectionReport, UnitFailure, WorkItem};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Looks up every id one after another on the calling task.
pub async fn run_sequential<L: Lookup>(lookup: &L, ids: &[String]) -> SectionReport {
    let mut report = SectionReport::new("sequential", ExecutionMode::Sequential);
    report.inputs = ids.len();

    println!("   Mock db calls without concurrency");
    let start = Instant::now();

    for (index, id) in ids.iter().enumerate() {
        println!("   calling db");
        let item = WorkItem::new(index, id.as_str());
        match lookup.lookup(&item).await {
            Ok(value) => report.results.push(value),
            Err(error) => {
                warn!("Sequential lookup failed: {}", error);
                report.failures.push(UnitFailure { item, error });
            }
        }
    }

    print_timing(start.elapsed(), &report.results);
    report
}

/// Fans the ids out through an [`Aggregator`] and joins on the results.
pub async fn run_concurrent<L: Lookup>(
    lookup: L,
    ids: &[String],
    options: AggregatorOptions,
) -> SectionReport {
    let (name, mode) = if options.log_snapshots {
        ("snapshots", ExecutionMode::ConcurrentWithSnapshots)
    } else {
        ("concurrent", ExecutionMode::Concurrent)
    };

    if options.log_snapshots {
        println!("   Every unit logs the results collected so far after its append");
    }
    println!("   Mock db calls on concurrent tasks");

    let start = Instant::now();
    let aggregator = Aggregator::with_options(lookup, options);

    for id in ids {
        println!("   calling db (task)");
        aggregator.dispatch([id.as_str()]);
    }
    debug!(
        "{} units outstanding, {} results so far",
        aggregator.outstanding(),
        aggregator.snapshot().await.len()
    );

    let mut report = match aggregator.wait().await {
        Ok(results) => {
            let (values, failures) = results.into_parts();
            let mut report = SectionReport::new(name, mode);
            report.results = values;
            report.failures = failures;
            report
        }
        Err(e) => SectionReport::failed(name, mode, e.to_string()),
    };
    report.inputs = ids.len();

    print_timing(start.elapsed(), &report.results);
    report
}

/// Runs one independent aggregation per dataset and joins them all.
pub async fn run_datasets(
    datasets: &BTreeMap<String, BTreeMap<String, String>>,
    max_delay: Duration,
    options: AggregatorOptions,
    show_progress: bool,
) -> SectionReport {
    let mut report = SectionReport::new("datasets", ExecutionMode::Parallel);

    let multi = MultiProgress::new();
    if !show_progress {
        multi.set_draw_target(ProgressDrawTarget::hidden());
    }
    let style = ProgressStyle::default_bar()
        .template("{prefix:>10} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");

    let start = Instant::now();

    let runs: Vec<_> = datasets
        .iter()
        .map(|(name, records)| {
            let lookup = DatasetLookup::new(records.clone(), max_delay);
            let ids = lookup.ids();
            report.inputs += ids.len();

            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(style.clone());
            bar.set_prefix(name.clone());

            let aggregator = Aggregator::with_options(lookup, options.clone()).with_progress(bar);
            aggregator.dispatch(ids);
            info!("Dispatched dataset {}", name);

            let name = name.clone();
            async move { (name, aggregator.wait().await) }
        })
        .collect();

    let mut errors = Vec::new();
    for (name, outcome) in join_all(runs).await {
        match outcome {
            Ok(results) => {
                println!("   {}: {:?}", name, results.sorted_values());
                let (values, failures) = results.into_parts();
                report.results.extend(values);
                report.failures.extend(failures);
            }
            Err(e) => {
                println!("   {}: failed ({})", name, e);
                errors.push(format!("{}: {}", name, e));
            }
        }
    }

    if !errors.is_empty() {
        report.error = Some(errors.join("; "));
    }

    println!(
        "   Total execution time for {} datasets: {:?}",
        datasets.len(),
        start.elapsed()
    );
    report
}

fn print_timing(elapsed: Duration, results: &[String]) {
    println!("   Total execution time: {:?}", elapsed);
    println!("   The results are {:?}", results);
}
