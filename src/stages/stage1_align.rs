use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::TransformConfig;
use crate::error::{EtlError, Result};
use crate::models::{next_month, AlignedRow, IndexSeries, NominalRow, NominalSeries};

const STAGE: &str = "stage1_align";

/// Configuration for Stage 1 alignment and deflation
#[derive(Debug, Clone)]
pub struct Stage1Config {
    /// Month whose cumulative index anchors every real price
    pub reference_date: NaiveDate,
}

impl Default for Stage1Config {
    fn default() -> Self {
        Self::from(&TransformConfig::default())
    }
}

impl From<&TransformConfig> for Stage1Config {
    fn from(config: &TransformConfig) -> Self {
        Self {
            reference_date: config.reference_date,
        }
    }
}

/// Result of Stage 1
#[derive(Debug)]
pub struct Stage1Result {
    /// Aligned and deflated rows in date order
    pub rows: Vec<AlignedRow>,
    /// Cumulative index at the reference date
    pub reference_cumulative: f64,
    /// Rows whose date was inferred from the previous row
    pub dates_filled: usize,
    /// Rows whose price was copied from an earlier row
    pub prices_filled: usize,
    /// Rows with no index observation for their month
    pub unmatched_index: usize,
}

/// Execute Stage 1: align the nominal series and deflate it
///
/// 1. Infers blank dates as previous month + 1
/// 2. Forward-fills blank prices
/// 3. Left-joins the index series by month
/// 4. Accumulates the index and anchors it at the reference date
/// 5. Restates every price in reference-month purchasing power
pub fn execute_stage1(
    nominal: &NominalSeries,
    index: &IndexSeries,
    config: &Stage1Config,
) -> Result<Stage1Result> {
    let dates_missing = nominal.missing_dates();
    let filled = fill_missing_dates(nominal)?;
    let dates: Vec<NaiveDate> = filled.rows.iter().filter_map(|r| r.date).collect();
    ensure_increasing(&dates)?;

    let raw_prices: Vec<Option<String>> = filled.rows.iter().map(|r| r.price.clone()).collect();
    let prices_missing = raw_prices.iter().filter(|p| p.is_none()).count();
    let raw_prices = forward_fill(&raw_prices);
    let prices_filled = prices_missing - raw_prices.iter().filter(|p| p.is_none()).count();

    let prices = raw_prices
        .iter()
        .map(|p| p.as_deref().map(parse_price).transpose())
        .collect::<Result<Vec<Option<f64>>>>()?;

    let index_values = join_index(&dates, index);
    let unmatched_index = index_values.iter().filter(|v| v.is_none()).count();
    if unmatched_index > 0 {
        warn!(
            "{} of {} months have no index observation; their cumulative index is carried forward",
            unmatched_index,
            dates.len()
        );
    }

    let cumulative = cumulative_index(&index_values);
    let reference_cumulative = reference_cumulative(&dates, &cumulative, config.reference_date)?;
    info!(
        "Stage 1: reference {} has cumulative index {:.4}",
        config.reference_date, reference_cumulative
    );

    let rows: Vec<AlignedRow> = dates
        .iter()
        .enumerate()
        .map(|(i, &date)| AlignedRow {
            date,
            nominal_price: prices[i],
            index_value: index_values[i],
            cumulative_index: cumulative[i],
            real_price: prices[i].map(|p| real_price(p, cumulative[i], reference_cumulative)),
        })
        .collect();

    info!(
        "Stage 1: {} rows aligned ({} dates inferred, {} prices forward-filled)",
        rows.len(),
        dates_missing,
        prices_filled
    );

    Ok(Stage1Result {
        rows,
        reference_cumulative,
        dates_filled: dates_missing,
        prices_filled,
        unmatched_index,
    })
}

/// Fill blank dates with the previous row's date plus one month.
///
/// Runs of blanks are filled in one pass, each from the row just filled
/// above it. A series without blanks is returned unchanged. A blank first
/// row has nothing to count from and is rejected.
pub fn fill_missing_dates(series: &NominalSeries) -> Result<NominalSeries> {
    let mut rows: Vec<NominalRow> = Vec::with_capacity(series.len());
    let mut previous: Option<NaiveDate> = None;

    for (i, row) in series.rows.iter().enumerate() {
        let date = match (row.date, previous) {
            (Some(date), _) => date,
            (None, Some(prev)) => next_month(prev).ok_or_else(|| {
                EtlError::source_format(STAGE, format!("date overflow after {}", prev))
            })?,
            (None, None) => {
                return Err(EtlError::source_format(
                    STAGE,
                    format!("row {} has no date and no earlier row to infer it from", i + 1),
                ));
            }
        };
        previous = Some(date);
        rows.push(NominalRow {
            date: Some(date),
            price: row.price.clone(),
        });
    }

    Ok(NominalSeries::new(rows))
}

fn ensure_increasing(dates: &[NaiveDate]) -> Result<()> {
    for pair in dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(EtlError::source_format(
                STAGE,
                format!("dates not increasing: {} follows {}", pair[1], pair[0]),
            ));
        }
    }
    Ok(())
}

/// Replace each `None` with the nearest preceding value; leading `None`s stay
pub fn forward_fill<T: Clone>(values: &[Option<T>]) -> Vec<Option<T>> {
    let mut last: Option<T> = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = v.clone();
            }
            last.clone()
        })
        .collect()
}

/// Parse a comma-decimal price ("312,45") into a number
pub fn parse_price(text: &str) -> Result<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EtlError::NumericParse {
            stage: STAGE,
            value: text.to_string(),
        })
}

/// Left join: the index value for each date, `None` where the provider has none
pub fn join_index(dates: &[NaiveDate], index: &IndexSeries) -> Vec<Option<f64>> {
    let by_date: HashMap<NaiveDate, f64> = index
        .observations
        .iter()
        .rev()
        .map(|o| (o.date, o.value))
        .collect();
    dates.iter().map(|d| by_date.get(d).copied()).collect()
}

/// Running sum of index values.
///
/// A month without an observation carries the previous running total
/// forward unchanged; before the first observation the total is 0.
pub fn cumulative_index(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |total, v| {
            if let Some(v) = v {
                *total += v;
            }
            Some(*total)
        })
        .collect()
}

/// Cumulative index of the row dated exactly `reference`
pub fn reference_cumulative(
    dates: &[NaiveDate],
    cumulative: &[f64],
    reference: NaiveDate,
) -> Result<f64> {
    dates
        .iter()
        .position(|d| *d == reference)
        .map(|i| cumulative[i])
        .ok_or(EtlError::ReferenceDateNotFound { date: reference })
}

/// Restate a nominal price in reference-month purchasing power, 2 decimals
pub fn real_price(nominal: f64, cumulative: f64, reference_cumulative: f64) -> f64 {
    let real = nominal + nominal * (reference_cumulative - cumulative) / 100.0;
    debug!("real price {} -> {}", nominal, real);
    round_half_even(real, 2)
}

/// Round to `decimals` places, ties to even
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
