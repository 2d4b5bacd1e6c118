use chrono::NaiveDate;
use serde::Serialize;

use super::{AlignedRow, BaselineRow};

/// An aligned row joined to its baseline counterpart, with the upserted values
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub aligned: AlignedRow,
    /// Matching baseline row, `None` for months new to this run
    pub baseline: Option<BaselineRow>,
    /// Value published by this run (the real price)
    pub new_value: Option<f64>,
    /// Relative change against the baseline value; `None` when undefined
    pub percent_change: Option<f64>,
}

impl MergedRow {
    pub fn date(&self) -> NaiveDate {
        self.aligned.date
    }

    pub fn prior_value(&self) -> Option<f64> {
        self.baseline.as_ref().and_then(|b| b.prior_value)
    }
}

/// Fixed-schema record of the published indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    /// `dt_cmdty`
    pub date: NaiveDate,
    /// `nome_cmdty`
    pub commodity_name: String,
    /// `tipo_cmdty`
    pub commodity_type: String,
    /// `cmdty_um`
    pub unit: String,
    /// `cmdty_vl_rs_um`
    pub value: Option<f64>,
    /// `cmdty_var_mes_perc`
    pub percent_change: Option<f64>,
    /// `dt_etl`
    pub etl_date: NaiveDate,
}
