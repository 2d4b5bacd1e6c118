use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter};
use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::models::OutputRow;

pub const COL_DATE: &str = "dt_cmdty";
pub const COL_NAME: &str = "nome_cmdty";
pub const COL_TYPE: &str = "tipo_cmdty";
pub const COL_UNIT: &str = "cmdty_um";
pub const COL_VALUE: &str = "cmdty_vl_rs_um";
pub const COL_PERCENT: &str = "cmdty_var_mes_perc";
pub const COL_ETL_DATE: &str = "dt_etl";

/// Build the output frame with the published column names and types
pub fn output_frame(rows: &[OutputRow]) -> PolarsResult<DataFrame> {
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.commodity_name.as_str()).collect();
    let types: Vec<&str> = rows.iter().map(|r| r.commodity_type.as_str()).collect();
    let units: Vec<&str> = rows.iter().map(|r| r.unit.as_str()).collect();
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
    let percents: Vec<Option<f64>> = rows.iter().map(|r| r.percent_change).collect();
    let etl_dates: Vec<NaiveDate> = rows.iter().map(|r| r.etl_date).collect();

    df!(
        COL_DATE => dates,
        COL_NAME => names,
        COL_TYPE => types,
        COL_UNIT => units,
        COL_VALUE => values,
        COL_PERCENT => percents,
        COL_ETL_DATE => etl_dates,
    )
}

/// Replace the file at `path` with the given rows.
///
/// The frame is written to a sibling temporary file and renamed over the
/// target once complete, so readers never observe a half-written file.
pub fn write_output(rows: &[OutputRow], path: &Path) -> Result<PathBuf> {
    let mut df = output_frame(rows).map_err(|e| EtlError::persistence(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EtlError::persistence(parent, e))?;
    }

    let tmp_path = staging_path(path);
    let written = File::create(&tmp_path)
        .map_err(|e| EtlError::persistence(&tmp_path, e))
        .and_then(|mut file| {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Zstd(None))
                .finish(&mut df)
                .map_err(|e| EtlError::persistence(&tmp_path, e))?;
            file.sync_all().map_err(|e| EtlError::persistence(&tmp_path, e))
        });

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        EtlError::persistence(path, e)
    })?;

    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(path.to_path_buf())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read an output file back into rows
pub fn read_output(path: &Path) -> Result<Vec<OutputRow>> {
    let file = File::open(path).map_err(|e| EtlError::persistence(path, e))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| EtlError::persistence(path, e))?;
    rows_from_frame(&df).map_err(|e| EtlError::persistence(path, e))
}

fn rows_from_frame(df: &DataFrame) -> PolarsResult<Vec<OutputRow>> {
    let dates: Vec<Option<NaiveDate>> = df
        .column(COL_DATE)?
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .collect();
    let etl_dates: Vec<Option<NaiveDate>> = df
        .column(COL_ETL_DATE)?
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .collect();
    let names = df.column(COL_NAME)?.str()?;
    let types = df.column(COL_TYPE)?.str()?;
    let units = df.column(COL_UNIT)?.str()?;
    let values = df.column(COL_VALUE)?.f64()?;
    let percents = df.column(COL_PERCENT)?.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(date), Some(etl_date)) = (dates[i], etl_dates[i]) else {
            return Err(PolarsError::ComputeError(
                format!("null date in output row {}", i).into(),
            ));
        };
        rows.push(OutputRow {
            date,
            commodity_name: names.get(i).unwrap_or_default().to_string(),
            commodity_type: types.get(i).unwrap_or_default().to_string(),
            unit: units.get(i).unwrap_or_default().to_string(),
            value: values.get(i),
            percent_change: percents.get(i),
            etl_date,
        });
    }
    Ok(rows)
}
