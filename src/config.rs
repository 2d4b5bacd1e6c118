use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{EtlError, Result};

/// Full pipeline configuration, loadable from TOML.
///
/// Every section is optional in the file; missing keys take the defaults of
/// the production deployment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: SourcesConfig,
    pub index: IndexConfig,
    pub audit: AuditConfig,
    pub transform: TransformConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Monthly nominal price sheet (xlsx/xls/ods or a CSV export)
    pub nominal_path: PathBuf,
    /// Previously published output, as CSV
    pub baseline_path: PathBuf,
    /// Rows dropped above the header row of the nominal sheet
    pub nominal_skip_rows: usize,
    /// Field delimiter when the nominal sheet is a CSV export
    pub csv_delimiter: char,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            nominal_path: PathBuf::from("./files/xlsx/CEPEA-20250416134013.xlsx"),
            baseline_path: PathBuf::from("./files/csv/boi_gordo_base.csv"),
            nominal_skip_rows: 3,
            csv_delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// SGS series code (433 is the monthly IPCA)
    pub series_code: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub base_url: String,
    /// Also write the parsed series as a semicolon CSV
    pub save_csv: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            series_code: 433,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap_or_default(),
            base_url: "https://api.bcb.gov.br/dados/serie".to_string(),
            save_csv: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub json_dir: PathBuf,
    pub csv_dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            json_dir: PathBuf::from("./files/json"),
            csv_dir: PathBuf::from("./files/csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Month whose purchasing power all real prices are expressed in
    pub reference_date: NaiveDate,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub commodity_name: String,
    pub commodity_type: String,
    pub unit: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./files/parquet/boi_gordo_saida.parquet"),
            commodity_name: "Boi_Gordo".to_string(),
            commodity_type: "Indicador do Boi Gordo CEPEA/B3".to_string(),
            unit: "15 Kg/carcaça".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| EtlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.start_date > self.index.end_date {
            return Err(EtlError::Config(format!(
                "index start_date {} is after end_date {}",
                self.index.start_date, self.index.end_date
            )));
        }
        if !self.sources.csv_delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "csv_delimiter {:?} must be a single ASCII character",
                self.sources.csv_delimiter
            )));
        }
        Ok(())
    }
}

/// Per-run identity and clock, threaded through every stage instead of
/// being read from the wall clock where it is used.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    /// Names the audit files of this run
    pub run_timestamp: NaiveDateTime,
    /// Stamped on every output row
    pub etl_date: NaiveDate,
}

impl RunContext {
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_timestamp,
            etl_date: run_timestamp.date(),
        }
    }

    /// Suffix used in audit file names
    pub fn file_stamp(&self) -> String {
        self.run_timestamp.format("%y-%m-%d_%H-%M-%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = PipelineConfig::default();
        assert_eq!(config.index.series_code, 433);
        assert_eq!(
            config.transform.reference_date,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(config.sources.nominal_skip_rows, 3);
        assert_eq!(config.output.commodity_name, "Boi_Gordo");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [transform]
            reference_date = "2024-12-01"

            [index]
            series_code = 189
            "#,
        )
        .unwrap();

        assert_eq!(
            config.transform.reference_date,
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
        assert_eq!(config.index.series_code, 189);
        assert_eq!(
            config.index.start_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert_eq!(config.output.unit, "15 Kg/carcaça");
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = PipelineConfig::from_toml(
            r#"
            [index]
            start_date = "2025-06-01"
            end_date = "2025-01-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_run_context_stamp() {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 19)
            .unwrap()
            .and_hms_opt(14, 3, 9)
            .unwrap();
        let ctx = RunContext::at(ts);
        assert_eq!(ctx.file_stamp(), "25-05-19_14-03-09");
        assert_eq!(ctx.etl_date, NaiveDate::from_ymd_opt(2025, 5, 19).unwrap());
    }
}
