//! End-of-run report
//!
//! This module collects per-entity outcomes and the failure tally of a run
//! and prints them for the operator at shutdown.

use crate::resilience::ErrorTally;
use crate::state::{EntityOutcome, EntityReport};
use chrono::{DateTime, Utc};

/// Everything a run produced, apart from the records themselves
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One report per processed entity, in input order
    pub entities: Vec<EntityReport>,

    /// Failure counts by code across the whole run
    pub tally: ErrorTally,

    /// Entities never started because shutdown was requested
    pub not_started: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            tally: ErrorTally::new(),
            not_started: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, report: EntityReport) {
        self.entities.push(report);
    }

    /// Stamps the finish time and attaches the run's failure tally
    pub fn finish(&mut self, tally: ErrorTally) {
        self.tally = tally;
        self.finished_at = Some(Utc::now());
    }

    /// Number of entities that ended with `outcome`
    pub fn count(&self, outcome: EntityOutcome) -> usize {
        self.entities
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    /// Entities that were skipped or only partially retrieved
    pub fn failed_entities(&self) -> Vec<&EntityReport> {
        self.entities
            .iter()
            .filter(|r| r.outcome.is_failure())
            .collect()
    }

    /// Feed items or edges emitted across all entities
    pub fn total_records(&self) -> u64 {
        self.entities.iter().map(|r| r.records).sum()
    }

    pub fn was_interrupted(&self) -> bool {
        self.not_started > 0 || self.count(EntityOutcome::Interrupted) > 0
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints a run report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &RunReport) {
    println!("=== Run Report ===\n");

    println!("Overview:");
    println!("  Entities processed: {}", report.entities.len());
    println!("  Records written: {}", report.total_records());
    if let Some(seconds) = report.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    if report.not_started > 0 {
        println!("  Not started (shutdown): {}", report.not_started);
    }
    println!();

    println!("Entities by Outcome:");
    for outcome in EntityOutcome::all_outcomes() {
        let count = report.count(outcome);
        if count > 0 {
            println!("  {}: {}", outcome, count);
        }
    }
    println!();

    let failed = report.failed_entities();
    if !failed.is_empty() {
        println!("Failed Entities ({}):", failed.len());
        for entity in failed {
            println!(
                "  - {} [{}] {} records: {}",
                entity.entity,
                entity.outcome,
                entity.records,
                entity.cause.as_deref().unwrap_or("unknown cause")
            );
        }
        println!();
    }

    if report.tally.is_empty() {
        println!("Failure Tally: none");
    } else {
        println!("Failure Tally ({} total):", report.tally.total());
        for (code, count) in report.tally.by_frequency() {
            println!("  {}: {}", code, count);
        }
    }
}
