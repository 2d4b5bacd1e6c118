use tracing::info;

use crate::config::{PipelineConfig, RunContext};
use crate::error::{EtlError, Result};
use crate::io::{read_baseline, read_nominal_sheet, write_raw_payload, write_series_csv, AuditTrail};
use crate::models::{BaselineRow, IndexSeries, NominalSeries};
use crate::sgs::{SeriesRequest, SgsClient};

/// Result of Stage 0 loading
#[derive(Debug)]
pub struct SourceData {
    /// Monthly nominal prices, dates and prices as found in the sheet
    pub nominal: NominalSeries,
    /// Price index observations for the configured range
    pub index: IndexSeries,
    /// Previously published rows
    pub baseline: Vec<BaselineRow>,
    /// Audit files written for the index fetch
    pub audit: AuditTrail,
}

/// Perform Stage 0: load the three sources
///
/// Local files are read first so a malformed sheet fails the run before
/// the index provider is contacted.
pub async fn load_sources(
    client: &SgsClient,
    config: &PipelineConfig,
    ctx: &RunContext,
) -> Result<SourceData> {
    let delimiter = u8::try_from(config.sources.csv_delimiter).map_err(|_| {
        EtlError::Config(format!(
            "csv_delimiter {:?} is not a single byte",
            config.sources.csv_delimiter
        ))
    })?;

    info!("Stage 0: Loading nominal prices from {:?}", config.sources.nominal_path);
    let nominal = read_nominal_sheet(
        &config.sources.nominal_path,
        config.sources.nominal_skip_rows,
        delimiter,
    )?;
    info!(
        "Loaded {} nominal rows ({} without a date)",
        nominal.len(),
        nominal.missing_dates()
    );

    info!("Stage 0: Loading baseline from {:?}", config.sources.baseline_path);
    let baseline = read_baseline(&config.sources.baseline_path)?;
    info!("Loaded {} baseline rows", baseline.len());

    let (index, audit) = load_index_series(client, config, ctx).await?;

    Ok(SourceData {
        nominal,
        index,
        baseline,
        audit,
    })
}

/// Fetch the index series and leave its audit trail on disk
pub async fn load_index_series(
    client: &SgsClient,
    config: &PipelineConfig,
    ctx: &RunContext,
) -> Result<(IndexSeries, AuditTrail)> {
    let request = SeriesRequest::from(&config.index);
    let response = client.fetch_series(&request).await?;

    let mut audit = AuditTrail {
        json_path: Some(write_raw_payload(&response.raw, &config.audit.json_dir, ctx)?),
        csv_path: None,
    };
    if config.index.save_csv {
        audit.csv_path = Some(write_series_csv(&response.series, &config.audit.csv_dir, ctx)?);
    }

    Ok((response.series, audit))
}
