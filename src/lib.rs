pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod sgs;
pub mod stages;

pub use config::{PipelineConfig, RunContext};
pub use error::{EtlError, Result};
pub use io::{read_output, write_output};
pub use models::{
    AlignedRow, BaselineRow, IndexObservation, IndexSeries, MergedRow, NominalRow, NominalSeries,
    OutputRow,
};
pub use pipeline::{run_pipeline, transform, PipelineSummary, Transformed};
pub use sgs::{SeriesRequest, SgsClient};
pub use stages::{
    execute_stage1, execute_stage2, execute_stage3, load_sources, Stage1Config, Stage3Config,
};
