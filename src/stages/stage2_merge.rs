use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::models::{AlignedRow, BaselineRow, MergedRow};

/// Result of Stage 2 merging
#[derive(Debug)]
pub struct Stage2Result {
    /// One row per aligned row, in the same order
    pub rows: Vec<MergedRow>,
    /// Aligned dates found in the baseline
    pub updated: usize,
    /// Aligned dates absent from the baseline
    pub inserted: usize,
    /// Baseline dates absent from this run, dropped from the output
    pub dropped: usize,
    /// Rows whose percent change is undefined
    pub null_percent_changes: usize,
}

/// Execute Stage 2: upsert the aligned series onto the baseline
///
/// Left join from the aligned side on exact date. Every aligned row is kept;
/// baseline rows for months this run does not cover are dropped.
pub fn execute_stage2(aligned: &[AlignedRow], baseline: &[BaselineRow]) -> Stage2Result {
    let mut by_date: HashMap<NaiveDate, &BaselineRow> = HashMap::with_capacity(baseline.len());
    for row in baseline {
        if by_date.contains_key(&row.date) {
            warn!("Baseline has more than one row for {}, keeping the first", row.date);
            continue;
        }
        by_date.insert(row.date, row);
    }

    let mut updated = 0;
    let mut null_percent_changes = 0;

    let rows: Vec<MergedRow> = aligned
        .iter()
        .map(|row| {
            let matched = by_date.get(&row.date).map(|b| (*b).clone());
            if matched.is_some() {
                updated += 1;
            }

            let prior_value = matched.as_ref().and_then(|b| b.prior_value);
            let percent_change = percent_change(row.real_price, prior_value);
            if percent_change.is_none() {
                null_percent_changes += 1;
                debug!(
                    "{}: percent change undefined (real {:?}, prior {:?})",
                    row.date, row.real_price, prior_value
                );
            }

            MergedRow {
                aligned: row.clone(),
                baseline: matched,
                new_value: row.real_price,
                percent_change,
            }
        })
        .collect();

    let inserted = rows.len() - updated;
    let covered: HashSet<NaiveDate> = aligned.iter().map(|r| r.date).collect();
    let dropped = by_date.keys().filter(|d| !covered.contains(d)).count();

    info!(
        "Stage 2: {} updated, {} inserted, {} baseline rows dropped, {} null percent changes",
        updated, inserted, dropped, null_percent_changes
    );

    Stage2Result {
        rows,
        updated,
        inserted,
        dropped,
        null_percent_changes,
    }
}

/// Relative change from `prior` to `current`.
///
/// `None` when either side is missing or the prior value is zero, so no
/// infinite or NaN value ever reaches the output.
pub fn percent_change(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    let (current, prior) = (current?, prior?);
    if prior == 0.0 {
        return None;
    }
    let change = (current - prior) / prior;
    change.is_finite().then_some(change)
}
