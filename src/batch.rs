//! Parallel batch scoring and per-entity JSON export
//!
//! A batch takes one rule snapshot up front and scores every entity against
//! it in parallel. Fetch and export failures are logged and counted per entity;
//! they never stop the rest of the batch.

use crate::decision::MANUAL_REVIEW;
use crate::engine::{FinanceEngine, FinanceScore, HealthEngine, HealthScore};
use crate::error::{ExportError, SourceError};
use crate::input::{FinanceInput, HealthProposal, ProposalHeader};
use crate::record::ScoreRecord;
use crate::report::{FinanceReport, HealthExport, HealthReport, HealthSummary};
use crate::rules::{FinanceRules, HealthRules, RuleStore};
use crate::source::{LabSource, ProposalSource};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Counters for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub scored: usize,
    pub source_failures: usize,
    pub manual_review: usize,
    pub written: usize,
    pub export_failures: usize,
}

impl BatchStats {
    fn count_scores<'a>(&mut self, records: impl Iterator<Item = &'a ScoreRecord>) {
        for record in records {
            self.scored += 1;
            if record.underwriting_flag == MANUAL_REVIEW {
                self.manual_review += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinanceBatch {
    pub scores: Vec<FinanceScore>,
    pub stats: BatchStats,
}

/// A scored health proposal with the header echoed in its output
#[derive(Debug, Clone)]
pub struct HealthOutcome {
    pub header: ProposalHeader,
    pub score: HealthScore,
}

#[derive(Debug, Clone)]
pub struct HealthBatch {
    pub outcomes: Vec<HealthOutcome>,
    pub stats: BatchStats,
}

/// Keep successes in source order, log and count failures
fn collect_fetched<T>(
    ids: &[String],
    results: Vec<Result<T, SourceError>>,
    stats: &mut BatchStats,
) -> Vec<T> {
    let mut items = Vec::with_capacity(results.len());
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(item) => items.push(item),
            Err(err) => {
                log::error!("skipping '{}': {}", id, err);
                stats.source_failures += 1;
            }
        }
    }
    items
}

/// Score every proposal the source supplies
pub fn run_finance<S>(store: &RuleStore<FinanceRules>, source: &S) -> FinanceBatch
where
    S: ProposalSource<FinanceInput> + Sync,
{
    let engine = FinanceEngine::new(store.snapshot());
    let ids = source.entity_ids();
    log::info!("Calculating finance scores for {} proposals", ids.len());

    let results: Vec<Result<FinanceScore, SourceError>> = ids
        .par_iter()
        .map(|id| source.fetch(id).map(|input| engine.score(&input)))
        .collect();

    let mut stats = BatchStats::default();
    let scores = collect_fetched(&ids, results, &mut stats);
    stats.count_scores(scores.iter().map(|s| &s.record));
    log::info!(
        "Finance scoring complete: {} scored, {} manual review, {} failed to load",
        stats.scored,
        stats.manual_review,
        stats.source_failures
    );
    FinanceBatch { scores, stats }
}

/// Score every health proposal the source supplies
pub fn run_health<S, L>(store: &RuleStore<HealthRules>, source: &S, labs: &L) -> HealthBatch
where
    S: ProposalSource<HealthProposal> + Sync,
    L: LabSource + Sync,
{
    let engine = HealthEngine::new(store.snapshot());
    let ids = source.entity_ids();
    log::info!("Calculating health scores for {} proposals", ids.len());

    let results: Vec<Result<HealthOutcome, SourceError>> = ids
        .par_iter()
        .map(|id| {
            source.fetch(id).map(|proposal| {
                let values = labs.lab_values(&proposal);
                HealthOutcome {
                    score: engine.score(&proposal, &values),
                    header: proposal.proposal,
                }
            })
        })
        .collect();

    let mut stats = BatchStats::default();
    let outcomes = collect_fetched(&ids, results, &mut stats);
    stats.count_scores(outcomes.iter().map(|o| &o.score.record));
    log::info!(
        "Health scoring complete: {} scored, {} manual review, {} failed to load",
        stats.scored,
        stats.manual_review,
        stats.source_failures
    );
    HealthBatch { outcomes, stats }
}

/// Entity id made safe for use in a file name
pub fn file_stem(entity_id: &str) -> String {
    let stem: String = entity_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}

/// One file stem per id, in order. A stem already taken (ignoring case) gets
/// `_2`, `_3`, ... appended so no two entities share an output file.
pub fn unique_stems<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    ids.into_iter()
        .map(|id| {
            let base = file_stem(id);
            let mut stem = base.clone();
            let mut n = 1;
            while !taken.insert(stem.to_ascii_lowercase()) {
                n += 1;
                stem = format!("{base}_{n}");
            }
            stem
        })
        .collect()
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` as JSON to `path`
pub fn write_json<T: Serialize>(path: &Path, entity: &str, value: &T) -> Result<(), ExportError> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| ExportError::Serialize {
        entity: entity.to_string(),
        source,
    })?;
    fs::write(path, body).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn tally(results: Vec<Result<(), ExportError>>, stats: &mut BatchStats) {
    for result in results {
        match result {
            Ok(()) => stats.written += 1,
            Err(err) => {
                log::error!("{}", err);
                stats.export_failures += 1;
            }
        }
    }
}

/// Write `finance_score_<id>.json` per proposal into `out_dir`, and the
/// canonical inputs as `inputs/finance_input_<id>.json`
pub fn export_finance(batch: &mut FinanceBatch, out_dir: &Path) -> Result<(), ExportError> {
    let inputs_dir = out_dir.join("inputs");
    create_dir(&inputs_dir)?;
    let stems = unique_stems(batch.scores.iter().map(|s| s.input.proposal_number.as_str()));

    let results: Vec<Result<(), ExportError>> = batch
        .scores
        .par_iter()
        .zip(stems.par_iter())
        .map(|(score, stem)| {
            let id = &score.input.proposal_number;
            write_json(&inputs_dir.join(format!("finance_input_{stem}.json")), id, &score.input)?;
            write_json(
                &out_dir.join(format!("finance_score_{stem}.json")),
                id,
                &FinanceReport::new(score),
            )
        })
        .collect();

    tally(results, &mut batch.stats);
    log::info!("Exported {} finance results to {}", batch.stats.written, out_dir.display());
    Ok(())
}

/// Write `health_score_<id>.json` per proposal and a `summary.json` into `out_dir`
pub fn export_health(batch: &mut HealthBatch, out_dir: &Path) -> Result<PathBuf, ExportError> {
    create_dir(out_dir)?;

    let reports: Vec<HealthReport> = batch
        .outcomes
        .iter()
        .map(|o| HealthReport::new(&o.header, &o.score))
        .collect();

    let stems = unique_stems(batch.outcomes.iter().map(|o| o.score.record.entity_id.as_str()));

    let results: Vec<Result<(), ExportError>> = batch
        .outcomes
        .par_iter()
        .zip(reports.par_iter())
        .zip(stems.par_iter())
        .map(|((outcome, report), stem)| {
            let id = &outcome.score.record.entity_id;
            let export = HealthExport {
                proposal: &outcome.header,
                score: report,
            };
            write_json(&out_dir.join(format!("health_score_{stem}.json")), id, &export)
        })
        .collect();
    tally(results, &mut batch.stats);

    let summary_path = out_dir.join("summary.json");
    write_json(&summary_path, "summary", &HealthSummary { results: reports })?;
    log::info!("Wrote {}", summary_path.display());
    Ok(summary_path)
}
