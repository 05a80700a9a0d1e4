use autologue_enrichment::client::fetch_prompt;
use autologue_enrichment::prelude::{
    EnrichmentClient, EnrichmentMetrics, FAMILIES, Family, Pipeline, PipelineConfig, PromptSet,
    TableReport,
};
use autologue_memory::{BridgeClient, BridgeConfig, KnowledgeGraph, MemoryToolbox, discover_bridge_url};
use autologue_perplexity::{PerplexityClient, PerplexityConfig};
use std::path::Path;

use crate::errors::CliError;

/// Totals of a run over several families.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Families whose tables were processed.
    pub families: usize,
    /// Tables processed.
    pub tables: usize,
    /// Records accepted.
    pub accepted: usize,
    /// Records abandoned.
    pub abandoned: usize,
    /// Records skipped as already processed.
    pub skipped: usize,
    /// Tables stopped by an upstream failure.
    pub stopped_early: usize,
    /// Query and timing counters.
    pub metrics: EnrichmentMetrics,
}

impl RunSummary {
    fn absorb(&mut self, report: &TableReport) {
        self.tables += 1;
        self.accepted += report.accepted;
        self.abandoned += report.abandoned;
        self.skipped += report.skipped;
        self.stopped_early += usize::from(report.stopped_early);
        self.metrics.absorb(&report.metrics);
    }
}

/// Resolves `--family` into the families to process.
pub fn select_families(name: Option<&str>) -> Result<Vec<&'static Family>, CliError> {
    match name {
        Some(name) => Family::by_name(name)
            .map(|family| vec![family])
            .ok_or_else(|| CliError::UnknownFamily(name.to_string())),
        None => Ok(FAMILIES.iter().collect()),
    }
}

/// Processes `families` in order, building each family's query client with
/// `client_for`.
///
/// A family whose client or ledger cannot be set up is logged and skipped.
pub async fn enrich_families<C, F>(
    families: &[&Family],
    root: &Path,
    config: PipelineConfig,
    mut client_for: F,
) -> RunSummary
where
    C: EnrichmentClient,
    F: FnMut(&Family) -> Result<C, CliError>,
{
    let prompts = PromptSet::load(root);
    let mut summary = RunSummary::default();

    for family in families {
        tracing::info!(family = family.name, "Processing family");
        let pipeline = client_for(family).and_then(|client| {
            Ok(Pipeline::for_family(client, prompts.clone(), family, root)?.with_config(config))
        });
        let mut pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(err) => {
                tracing::error!(family = family.name, %err, "Skipping family");
                continue;
            }
        };

        match pipeline.process_family(family, root).await {
            Ok(reports) => {
                summary.families += 1;
                reports.iter().for_each(|report| summary.absorb(report));
            }
            Err(err) => tracing::error!(family = family.name, %err, "Skipping family"),
        }
    }

    tracing::info!(
        families = summary.families,
        tables = summary.tables,
        accepted = summary.accepted,
        abandoned = summary.abandoned,
        skipped = summary.skipped,
        queries = summary.metrics.queries,
        "Run complete"
    );
    summary
}

/// Connects the knowledge-graph memory, or returns `None` when it is
/// unreachable.
pub async fn connect_memory(bridge_url: Option<&str>) -> Option<MemoryToolbox<BridgeClient>> {
    let url = match discover_bridge_url(bridge_url).await {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(%err, "Running without memory tools");
            return None;
        }
    };

    let bridge = match BridgeClient::new(&BridgeConfig::new(&url)) {
        Ok(bridge) => bridge,
        Err(err) => {
            tracing::warn!(%err, "Running without memory tools");
            return None;
        }
    };
    match bridge.health().await {
        Ok(health) => tracing::info!(%url, %health, "Memory bridge connected"),
        Err(err) => tracing::warn!(%url, %err, "Memory bridge health check failed"),
    }
    Some(MemoryToolbox::new(bridge))
}

/// Builds the Perplexity research agent of `family`.
pub fn perplexity_for(
    family: &Family,
    root: &Path,
    config: &PerplexityConfig,
    memory: Option<&MemoryToolbox<BridgeClient>>,
) -> Result<PerplexityClient, CliError> {
    let layout = family.layout(root);
    let client = PerplexityClient::new(config.clone())?
        .with_agent_prompt(fetch_prompt(&layout.agent_prompt()))
        .with_answers_dir(layout.answers());
    Ok(match memory {
        Some(toolbox) => client.with_memory(toolbox.clone()),
        None => client,
    })
}
