pub mod audit;
pub mod input;
pub mod output;

pub use audit::{write_raw_payload, write_series_csv, AuditTrail};
pub use input::{nominal_from_rows, read_baseline, read_nominal_sheet};
pub use output::{read_output, write_output};
