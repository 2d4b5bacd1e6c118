use tracing::info;

use crate::config::{PipelineConfig, RunContext};
use crate::error::Result;
use crate::io::AuditTrail;
use crate::models::{BaselineRow, IndexSeries, MergedRow, NominalSeries};
use crate::sgs::SgsClient;
use crate::stages::{
    execute_stage1, execute_stage2, execute_stage3, load_sources, Stage1Config, Stage3Config,
    Stage3Result,
};

/// Outcome of a full run
#[derive(Debug)]
pub struct PipelineSummary {
    pub rows_written: usize,
    pub dates_filled: usize,
    pub prices_filled: usize,
    pub unmatched_index: usize,
    pub reference_cumulative: f64,
    pub baseline_updated: usize,
    pub baseline_inserted: usize,
    pub null_percent_changes: usize,
    /// Audit copies of the index payload written during loading
    pub audit: AuditTrail,
    pub output: Stage3Result,
}

/// Rows produced by the computation stages, before anything is written
#[derive(Debug)]
pub struct Transformed {
    pub merged: Vec<MergedRow>,
    pub dates_filled: usize,
    pub prices_filled: usize,
    pub unmatched_index: usize,
    pub reference_cumulative: f64,
    pub baseline_updated: usize,
    pub baseline_inserted: usize,
    pub null_percent_changes: usize,
}

/// Stages 1 and 2: align, deflate and upsert onto the baseline
pub fn transform(
    nominal: &NominalSeries,
    index: &IndexSeries,
    baseline: &[BaselineRow],
    config: &Stage1Config,
) -> Result<Transformed> {
    let aligned = execute_stage1(nominal, index, config)?;
    let merged = execute_stage2(&aligned.rows, baseline);

    Ok(Transformed {
        merged: merged.rows,
        dates_filled: aligned.dates_filled,
        prices_filled: aligned.prices_filled,
        unmatched_index: aligned.unmatched_index,
        reference_cumulative: aligned.reference_cumulative,
        baseline_updated: merged.updated,
        baseline_inserted: merged.inserted,
        null_percent_changes: merged.null_percent_changes,
    })
}

/// Run all four stages in order.
///
/// The output file is only touched after every earlier stage has
/// succeeded; any error aborts the run and leaves the previous output in
/// place.
pub async fn run_pipeline(
    client: &SgsClient,
    config: &PipelineConfig,
    ctx: &RunContext,
) -> Result<PipelineSummary> {
    info!("Run {} started at {}", ctx.run_id, ctx.run_timestamp);

    let sources = load_sources(client, config, ctx).await?;
    let transformed = transform(
        &sources.nominal,
        &sources.index,
        &sources.baseline,
        &Stage1Config::from(&config.transform),
    )?;
    let output = execute_stage3(
        &transformed.merged,
        &Stage3Config::from(&config.output),
        ctx,
    )?;

    info!("Run {} finished: {} rows published", ctx.run_id, output.rows.len());

    Ok(PipelineSummary {
        rows_written: output.rows.len(),
        dates_filled: transformed.dates_filled,
        prices_filled: transformed.prices_filled,
        unmatched_index: transformed.unmatched_index,
        reference_cumulative: transformed.reference_cumulative,
        baseline_updated: transformed.baseline_updated,
        baseline_inserted: transformed.baseline_inserted,
        null_percent_changes: transformed.null_percent_changes,
        audit: sources.audit,
        output,
    })
}
