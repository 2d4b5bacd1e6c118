use std::path::PathBuf;

use tracing::info;

use crate::config::{OutputConfig, RunContext};
use crate::error::Result;
use crate::io::write_output;
use crate::models::{MergedRow, OutputRow};

/// Configuration for Stage 3 projection
#[derive(Debug, Clone)]
pub struct Stage3Config {
    pub commodity_name: String,
    pub commodity_type: String,
    pub unit: String,
    /// Where the output is written
    pub output_path: PathBuf,
}

impl Default for Stage3Config {
    fn default() -> Self {
        Self::from(&OutputConfig::default())
    }
}

impl From<&OutputConfig> for Stage3Config {
    fn from(config: &OutputConfig) -> Self {
        Self {
            commodity_name: config.commodity_name.clone(),
            commodity_type: config.commodity_type.clone(),
            unit: config.unit.clone(),
            output_path: config.path.clone(),
        }
    }
}

/// Result of Stage 3
#[derive(Debug)]
pub struct Stage3Result {
    pub rows: Vec<OutputRow>,
    /// Path of the written file
    pub output_path: PathBuf,
}

/// Map merged rows onto the published schema
pub fn project(merged: &[MergedRow], config: &Stage3Config, ctx: &RunContext) -> Vec<OutputRow> {
    merged
        .iter()
        .map(|row| OutputRow {
            date: row.date(),
            commodity_name: config.commodity_name.clone(),
            commodity_type: config.commodity_type.clone(),
            unit: config.unit.clone(),
            value: row.new_value,
            percent_change: row.percent_change,
            etl_date: ctx.etl_date,
        })
        .collect()
}

/// Execute Stage 3: project and replace the output file
pub fn execute_stage3(
    merged: &[MergedRow],
    config: &Stage3Config,
    ctx: &RunContext,
) -> Result<Stage3Result> {
    let rows = project(merged, config, ctx);
    info!("Stage 3: Writing {} rows to {:?}", rows.len(), config.output_path);
    let output_path = write_output(&rows, &config.output_path)?;
    Ok(Stage3Result { rows, output_path })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::io::read_output;
    use crate::models::{AlignedRow, BaselineRow};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn merged() -> Vec<MergedRow> {
        vec![MergedRow {
            aligned: AlignedRow {
                date: ymd(2025, 1, 1),
                nominal_price: Some(100.0),
                index_value: Some(0.5),
                cumulative_index: 0.5,
                real_price: Some(100.3),
            },
            baseline: Some(BaselineRow::new(ymd(2025, 1, 1), Some(95.0))),
            new_value: Some(100.3),
            percent_change: Some((100.3 - 95.0) / 95.0),
        }]
    }

    fn ctx() -> RunContext {
        RunContext::at(ymd(2025, 5, 19).and_hms_opt(10, 0, 0).unwrap())
    }

    #[test]
    fn test_stage3_config_default() {
        let config = Stage3Config::default();
        assert_eq!(config.commodity_name, "Boi_Gordo");
        assert_eq!(config.commodity_type, "Indicador do Boi Gordo CEPEA/B3");
        assert_eq!(config.unit, "15 Kg/carcaça");
    }

    #[test]
    fn test_project_attaches_constants_and_run_date() {
        let rows = project(&merged(), &Stage3Config::default(), &ctx());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, ymd(2025, 1, 1));
        assert_eq!(rows[0].commodity_name, "Boi_Gordo");
        assert_eq!(rows[0].value, Some(100.3));
        assert_eq!(rows[0].etl_date, ymd(2025, 5, 19));
    }

    #[test]
    fn test_execute_stage3_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Stage3Config {
            output_path: dir.path().join("boi_gordo_saida.parquet"),
            ..Default::default()
        };

        let result = execute_stage3(&merged(), &config, &ctx()).unwrap();

        assert_eq!(result.output_path, config.output_path);
        assert_eq!(read_output(&result.output_path).unwrap(), result.rows);
    }
}
