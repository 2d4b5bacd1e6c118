use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::RunContext;
use crate::error::{EtlError, Result};
use crate::models::IndexSeries;

/// Files written for one index fetch
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    pub json_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
}

/// Write the raw provider payload as pretty-printed JSON
pub fn write_raw_payload(
    payload: &serde_json::Value,
    dir: &Path,
    ctx: &RunContext,
) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("resposta_api_{}.json", ctx.file_stamp()));
    let file = std::fs::File::create(&path).map_err(|e| EtlError::persistence(&path, e))?;
    serde_json::to_writer_pretty(file, payload).map_err(|e| EtlError::persistence(&path, e))?;
    info!("Wrote raw index payload to {:?}", path);
    Ok(path)
}

#[derive(Serialize)]
struct AuditRecord {
    data: String,
    valor: f64,
}

/// Write the parsed series as a semicolon-delimited CSV
pub fn write_series_csv(series: &IndexSeries, dir: &Path, ctx: &RunContext) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("DATA_BCB_{}.csv", ctx.file_stamp()));
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&path)
        .map_err(|e| EtlError::persistence(&path, e))?;

    for obs in &series.observations {
        writer
            .serialize(AuditRecord {
                data: obs.date.format("%Y-%m-%d").to_string(),
                valor: obs.value,
            })
            .map_err(|e| EtlError::persistence(&path, e))?;
    }
    writer.flush().map_err(|e| EtlError::persistence(&path, e))?;

    info!("Wrote {} index observations to {:?}", series.len(), path);
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| EtlError::persistence(dir, e))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::IndexObservation;

    fn ctx() -> RunContext {
        RunContext::at(
            NaiveDate::from_ymd_opt(2025, 5, 19)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_write_raw_payload_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let payload = serde_json::json!([{"data": "01/01/2025", "valor": "0.16", "nota": "preço"}]);

        let path = write_raw_payload(&payload, &dir.path().join("json"), &ctx()).unwrap();

        assert!(path.ends_with("resposta_api_25-05-19_08-00-00.json"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("preço"));
        let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reparsed, payload);
    }

    #[test]
    fn test_write_series_csv() {
        let dir = tempfile::tempdir().unwrap();
        let series = IndexSeries::new(
            433,
            vec![
                IndexObservation {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    value: 0.16,
                },
                IndexObservation {
                    date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    value: 1.31,
                },
            ],
        );

        let path = write_series_csv(&series, dir.path(), &ctx()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "data;valor\n2025-01-01;0.16\n2025-02-01;1.31\n");
    }
}
