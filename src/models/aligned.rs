use chrono::NaiveDate;

/// A nominal row after gap-filling, index join and deflation
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    /// Month-start date, strictly increasing across the series
    pub date: NaiveDate,
    /// Parsed nominal price; `None` only when the leading rows had no price
    pub nominal_price: Option<f64>,
    /// Index observation for this month, if the provider had one
    pub index_value: Option<f64>,
    /// Running sum of index values up to and including this row
    pub cumulative_index: f64,
    /// Nominal price in reference-month purchasing power, 2 decimals
    pub real_price: Option<f64>,
}
