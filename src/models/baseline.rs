use chrono::NaiveDate;

/// A row of the previously published indicator, read back for the upsert
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineRow {
    pub date: NaiveDate,
    /// `cmdty_vl_rs_um` of the prior run
    pub prior_value: Option<f64>,
    /// `cmdty_var_mes_perc` of the prior run
    pub prior_percent_change: Option<f64>,
    pub commodity_name: Option<String>,
    pub commodity_type: Option<String>,
    pub unit: Option<String>,
    pub etl_date: Option<NaiveDate>,
}

impl BaselineRow {
    pub fn new(date: NaiveDate, prior_value: Option<f64>) -> Self {
        Self {
            date,
            prior_value,
            prior_percent_change: None,
            commodity_name: None,
            commodity_type: None,
            unit: None,
            etl_date: None,
        }
    }
}
