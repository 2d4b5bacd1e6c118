use chrono::{Datelike, Months, NaiveDate};

/// One row of the monthly nominal price sheet, before alignment
#[derive(Debug, Clone, PartialEq)]
pub struct NominalRow {
    /// First day of the month; `None` where the sheet leaves the cell blank
    pub date: Option<NaiveDate>,
    /// Raw price text, comma decimal separator (e.g. "312,45")
    pub price: Option<String>,
}

impl NominalRow {
    pub fn new(date: Option<NaiveDate>, price: Option<&str>) -> Self {
        Self {
            date,
            price: price.map(str::to_string),
        }
    }
}

/// Nominal price series in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NominalSeries {
    pub rows: Vec<NominalRow>,
}

impl NominalSeries {
    pub fn new(rows: Vec<NominalRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows still lacking a date
    pub fn missing_dates(&self) -> usize {
        self.rows.iter().filter(|r| r.date.is_none()).count()
    }
}

/// A single monthly observation of the price index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexObservation {
    pub date: NaiveDate,
    /// Monthly variation in percent
    pub value: f64,
}

/// Price index series keyed by month-start date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSeries {
    /// Series code at the provider
    pub code: u32,
    pub observations: Vec<IndexObservation>,
}

impl IndexSeries {
    pub fn new(code: u32, observations: Vec<IndexObservation>) -> Self {
        Self { code, observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Truncate a date to the first day of its month
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The month-start date one month after `date`
pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(1))
}

/// Parse a `MM/YYYY` label into the first day of that month
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let (month, year) = label.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}
