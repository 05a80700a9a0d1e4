//! Orchestration of the resolve/validate/score loop over records and tables.

use std::path::{Path, PathBuf};
use tokio::time::Instant;

use super::config::PipelineConfig;
use super::metrics::EnrichmentMetrics;
use crate::client::{EnrichmentClient, PromptSet};
use crate::error::{EnrichmentError, Result};
use crate::families::{Family, InputMode, category_of};
use crate::ledger::Ledger;
use crate::record::Record;
use crate::resolver::resolve_missing;
use crate::scorer::confidence_score;
use crate::sink::{RecordSink, read_table};
use crate::validator::{PriceFilter, validate};

/// Terminal state of one record in one run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Already in the ledger; nothing was queried.
    Skipped,
    /// Validated, scored and written to the output sink.
    Accepted {
        /// Confidence score written with the record.
        confidence: f64,
    },
    /// Retry ceiling exceeded; written to the output sink with zero confidence.
    Abandoned {
        /// Retry number at abandonment.
        retries: u32,
    },
}

/// Summary of one input table run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableReport {
    /// Input table processed.
    pub input: PathBuf,
    /// Records accepted.
    pub accepted: usize,
    /// Records abandoned.
    pub abandoned: usize,
    /// Records skipped as already processed.
    pub skipped: usize,
    /// `true` if an upstream failure stopped the table before its last row.
    pub stopped_early: bool,
    /// Query and timing counters.
    pub metrics: EnrichmentMetrics,
}

/// Enrichment pipeline for one product family.
///
/// Owns the family's ledger and processes records strictly one at a time:
/// each record is resolved, validated, scored and persisted (or retried)
/// before the next one starts.
pub struct Pipeline<C> {
    client: C,
    prompts: PromptSet,
    filter: PriceFilter,
    ledger: Ledger,
    errors: RecordSink,
    config: PipelineConfig,
    metrics: EnrichmentMetrics,
}

impl<C: EnrichmentClient> Pipeline<C> {
    /// Creates a pipeline with the default configuration.
    #[must_use]
    pub fn new(
        client: C,
        prompts: PromptSet,
        filter: PriceFilter,
        ledger: Ledger,
        errors: RecordSink,
    ) -> Self {
        Self {
            client,
            prompts,
            filter,
            ledger,
            errors,
            config: PipelineConfig::default(),
            metrics: EnrichmentMetrics::default(),
        }
    }

    /// Creates a pipeline for `family` under the catalogue `root`.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Persistence` if the family ledger exists but
    /// cannot be loaded.
    pub fn for_family(client: C, prompts: PromptSet, family: &Family, root: &Path) -> Result<Self> {
        let layout = family.layout(root);
        let ledger = Ledger::load(layout.ledger())?;
        Ok(Self::new(
            client,
            prompts,
            family.price_filter(),
            ledger,
            RecordSink::new(layout.errors()),
        ))
    }

    /// Replaces the retry configuration (fluent builder pattern).
    #[must_use]
    pub const fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The family ledger as it currently stands.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs one record to a terminal state.
    ///
    /// Records already in the ledger are skipped. Otherwise the loop resolves
    /// missing fields and validates; an accepted record is scored against the
    /// cache as it stood before this record, then cached and written to
    /// `output`. A rejected record is logged to the error sink and retried
    /// until its retry number exceeds the ceiling, then abandoned to `output`.
    ///
    /// Ledger and sink failures are logged and do not stop the record.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Upstream` if a query fails. Nothing is
    /// written for the record in that case.
    pub async fn process_record(&mut self, mut record: Record, output: &RecordSink) -> Result<RecordOutcome> {
        if self.ledger.is_processed(record.name()) {
            tracing::debug!(name = record.name(), "Already processed, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        for cycle in 1..=self.config.max_cycles {
            self.metrics.cycles += 1;
            let issued = resolve_missing(&self.client, &self.prompts, &mut record).await;
            self.metrics.queries += match issued {
                Ok(issued) => issued,
                Err(err) => {
                    tracing::error!(name = record.name(), %err, "Research failed");
                    return Err(err);
                }
            };

            match validate(&mut record, &self.filter) {
                Ok(()) => {
                    let confidence = confidence_score(
                        record.price.as_deref(),
                        &record.dimensions,
                        &self.ledger.cached_prices(),
                        &self.ledger.cached_dimensions(),
                    );
                    record.confidence_score = confidence;
                    record.llm2llm_score = 0.0;

                    keep_going(self.ledger.record_success(&record));
                    keep_going(output.append(&record));
                    tracing::info!(name = record.name(), confidence, cycle, "Record processed");
                    return Ok(RecordOutcome::Accepted { confidence });
                }
                Err(rejection) => {
                    keep_going(self.ledger.record_failure(record.name()));

                    let prior = self.errors.count_matching(record.name()).unwrap_or_else(|err| {
                        tracing::warn!(%err, "Could not count prior failures, assuming none");
                        0
                    });
                    let retries = u32::try_from(prior).unwrap_or(u32::MAX).saturating_add(1);
                    record.retries_number = retries;
                    record.confidence_score = 0.0;
                    record.llm2llm_score = 0.0;

                    if retries > self.config.max_retries {
                        return Ok(self.abandon(&record, output));
                    }

                    tracing::warn!(name = record.name(), %rejection, retries, "Research failed, retrying");
                    keep_going(self.errors.append(&record));
                }
            }
        }

        Ok(self.abandon(&record, output))
    }

    /// Processes every row of `input`, writing accepted and abandoned records
    /// to `output`.
    ///
    /// An upstream failure stops the table: later rows are not queried and
    /// the report is marked `stopped_early`.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Input` if the table cannot be read.
    pub async fn process_table(&mut self, input: &Path, output: &RecordSink) -> Result<TableReport> {
        let start = Instant::now();
        self.metrics = EnrichmentMetrics::default();
        let records = read_table(input)?;
        let rows = records.len();

        let mut report = TableReport {
            input: input.to_path_buf(),
            ..TableReport::default()
        };

        for record in records {
            match self.process_record(record, output).await {
                Ok(RecordOutcome::Skipped) => report.skipped += 1,
                Ok(RecordOutcome::Accepted { .. }) => report.accepted += 1,
                Ok(RecordOutcome::Abandoned { .. }) => report.abandoned += 1,
                Err(err) if err.is_upstream() => {
                    report.stopped_early = true;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        self.metrics.wall_time = start.elapsed();
        report.metrics = self.metrics;
        tracing::info!(
            input = %input.display(),
            output = %output.path().display(),
            rows,
            accepted = report.accepted,
            abandoned = report.abandoned,
            skipped = report.skipped,
            queries = report.metrics.queries,
            queries_per_cycle = report.metrics.queries_per_cycle(),
            wall_time_ms = u64::try_from(report.metrics.wall_time.as_millis()).unwrap_or(u64::MAX),
            stopped_early = report.stopped_early,
            "Table researched"
        );
        Ok(report)
    }

    /// Processes every input table of `family` under the catalogue `root`.
    ///
    /// Per-category families process each `input_<category>.tsv` in name
    /// order; single-table families process their one table. A table that
    /// cannot be read is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Input` if the family input directory cannot
    /// be listed.
    pub async fn process_family(&mut self, family: &Family, root: &Path) -> Result<Vec<TableReport>> {
        let layout = family.layout(root);
        let tables = match family.input {
            InputMode::Single(category) => vec![(layout.input_table(category), category.to_string())],
            InputMode::PerCategory => list_input_tables(&layout.inputs())?,
        };

        let mut reports = Vec::with_capacity(tables.len());
        for (input, category) in tables {
            tracing::info!(family = family.name, %category, "Researching category");
            let output = RecordSink::new(layout.output_table(&category));
            match self.process_table(&input, &output).await {
                Ok(report) => reports.push(report),
                Err(err) => tracing::error!(input = %input.display(), %err, "Skipping table"),
            }
        }
        Ok(reports)
    }

    fn abandon(&self, record: &Record, output: &RecordSink) -> RecordOutcome {
        tracing::error!(
            name = record.name(),
            retries = record.retries_number,
            "Research incomplete, abandoning"
        );
        keep_going(output.append(record));
        RecordOutcome::Abandoned {
            retries: record.retries_number,
        }
    }
}

/// Lists `input_*.tsv` tables of `dir` with their categories, sorted by name.
fn list_input_tables(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| EnrichmentError::Input {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut tables: Vec<(PathBuf, String)> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tsv"))
        .filter_map(|path| category_of(&path).map(|category| (path, category)))
        .collect();
    tables.sort();
    Ok(tables)
}

/// Ledger and sink failures are logged where they happen; the run goes on.
fn keep_going(result: Result<()>) {
    if let Err(err) = result {
        tracing::warn!(%err, "Continuing after persistence failure");
    }
}
