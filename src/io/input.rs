use std::iter;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::models::{parse_month_label, BaselineRow, NominalRow, NominalSeries};

/// Raw cell text of one sheet row; blank cells are `None`
pub type SheetRow = Vec<Option<String>>;

/// Read the monthly nominal price sheet.
///
/// Spreadsheets (xlsx, xlsm, xls, ods) are read from their first worksheet;
/// anything with a `.csv` extension is read as a delimited export of that
/// sheet.
pub fn read_nominal_sheet(path: &Path, skip_rows: usize, delimiter: u8) -> Result<NominalSeries> {
    let source_name = path.display().to_string();
    let rows = match extension(path).as_deref() {
        Some("csv") => read_csv_rows(path, delimiter)?,
        _ => read_workbook_rows(path)?,
    };
    debug!("Read {} raw rows from {}", rows.len(), source_name);
    nominal_from_rows(rows, skip_rows, &source_name)
}

/// Turn raw sheet rows into a nominal series.
///
/// Drops `skip_rows` leading rows plus the header row that follows them,
/// then takes the first column as a `MM/YYYY` date label and the second as
/// the price text. Date labels that do not parse become blanks, to be
/// gap-filled by alignment.
pub fn nominal_from_rows<I>(rows: I, skip_rows: usize, source_name: &str) -> Result<NominalSeries>
where
    I: IntoIterator<Item = SheetRow>,
{
    let mut rows = rows.into_iter().skip(skip_rows);

    let header = rows.next().ok_or_else(|| {
        EtlError::source_format(
            source_name,
            format!("no header row after skipping {} rows", skip_rows),
        )
    })?;
    if header.len() < 2 {
        return Err(EtlError::source_format(
            source_name,
            format!("expected date and price columns, found {}", header.len()),
        ));
    }

    let mut series = Vec::new();
    for mut row in rows {
        row.truncate(2);
        let mut cells = row.into_iter();
        let date_cell = cells.next().flatten();
        let price_cell = cells.next().flatten();

        if date_cell.is_none() && price_cell.is_none() {
            continue;
        }

        series.push(NominalRow {
            date: date_cell.as_deref().and_then(parse_month_label),
            price: price_cell,
        });
    }

    Ok(NominalSeries::new(series))
}

fn read_workbook_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let source_name = path.display().to_string();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| EtlError::source_format(&source_name, format!("cannot open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::source_format(&source_name, "workbook has no worksheets"))?
        .map_err(|e| EtlError::source_format(&source_name, format!("cannot read worksheet: {}", e)))?;

    Ok(rows_from_range(&range))
}

/// Sheet rows counted from row 1.
///
/// A worksheet range starts at its first used cell; blank leading rows are
/// put back so `skip_rows` counts from the top of the sheet. Columns stay
/// relative to the first used column.
fn rows_from_range(range: &Range<Data>) -> Vec<SheetRow> {
    let start_row = range.start().map_or(0, |(row, _)| row);
    iter::repeat_n(SheetRow::new(), start_row as usize)
        .chain(range.rows().map(|row| row.iter().map(cell_text).collect()))
        .collect()
}

fn read_csv_rows(path: &Path, delimiter: u8) -> Result<Vec<SheetRow>> {
    let source_name = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| EtlError::source_format(&source_name, format!("cannot open: {}", e)))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EtlError::source_format(&source_name, e.to_string()))?;
        rows.push(record.iter().map(non_blank).collect());
    }
    Ok(rows)
}

/// Render a spreadsheet cell as the text the sheet displays
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => non_blank(s),
        Data::DateTimeIso(s) => iso_month_label(s).or_else(|| non_blank(s)),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        // Month cells stored as real dates are rendered back to the label form
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.format("%m/%Y").to_string()),
        _ => None,
    }
}

/// `MM/YYYY` label of an ISO 8601 date, with or without a time part
fn iso_month_label(text: &str) -> Option<String> {
    let (date, rest) = NaiveDate::parse_and_remainder(text.trim(), "%Y-%m-%d").ok()?;
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    Some(date.format("%m/%Y").to_string())
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Read the baseline CSV of a previous run.
///
/// Requires a header with `dt_cmdty` and `cmdty_vl_rs_um`; the remaining
/// columns of the published schema are picked up when present.
pub fn read_baseline(path: &Path) -> Result<Vec<BaselineRow>> {
    let source_name = path.display().to_string();
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| EtlError::source_format(&source_name, format!("cannot open: {}", e)))?;
    baseline_from_reader(reader, &source_name)
}

/// Parse baseline rows from any CSV reader
pub fn baseline_from_reader<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    source_name: &str,
) -> Result<Vec<BaselineRow>> {
    let headers = reader
        .headers()
        .map_err(|e| EtlError::source_format(source_name, e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let date_col = column("dt_cmdty")
        .ok_or_else(|| EtlError::source_format(source_name, "missing column dt_cmdty"))?;
    let value_col = column("cmdty_vl_rs_um")
        .ok_or_else(|| EtlError::source_format(source_name, "missing column cmdty_vl_rs_um"))?;
    let perc_col = column("cmdty_var_mes_perc");
    let name_col = column("nome_cmdty");
    let type_col = column("tipo_cmdty");
    let unit_col = column("cmdty_um");
    let etl_col = column("dt_etl");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EtlError::source_format(source_name, e.to_string()))?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(non_blank);

        let date_text = cell(Some(date_col)).ok_or_else(|| {
            EtlError::source_format(source_name, format!("blank dt_cmdty in record {}", rows.len() + 1))
        })?;
        let date = parse_baseline_date(&date_text).ok_or_else(|| {
            EtlError::source_format(source_name, format!("unparseable dt_cmdty {:?}", date_text))
        })?;

        rows.push(BaselineRow {
            date,
            prior_value: parse_optional_f64(cell(Some(value_col)))?,
            prior_percent_change: parse_optional_f64(cell(perc_col))?,
            commodity_name: cell(name_col),
            commodity_type: cell(type_col),
            unit: cell(unit_col),
            etl_date: cell(etl_col).as_deref().and_then(parse_baseline_date),
        });
    }

    Ok(rows)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `DD/MM/YYYY`
pub fn parse_baseline_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .ok()
}

fn parse_optional_f64(text: Option<String>) -> Result<Option<f64>> {
    match text {
        None => Ok(None),
        Some(t) => t
            .parse::<f64>()
            .map(Some)
            .map_err(|_| EtlError::NumericParse {
                stage: "baseline",
                value: t,
            }),
    }
}
