use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use boi_gordo_etl::{read_output, run_pipeline, PipelineConfig, RunContext, SgsClient};

#[derive(Parser)]
#[command(name = "boi-gordo")]
#[command(author, version, about = "Inflation-adjusted Boi Gordo price indicator ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract, transform and load pipeline
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Nominal price sheet (xlsx, or csv export)
        #[arg(long)]
        nominal: Option<PathBuf>,

        /// Baseline CSV from the previous run
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Output Parquet file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reference month for real prices (YYYY-MM-DD, first of month)
        #[arg(long)]
        reference_date: Option<NaiveDate>,

        /// SGS series code of the price index
        #[arg(long)]
        series_code: Option<u32>,

        /// First day of the index range (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Last day of the index range (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the rows of a published output file
    Inspect {
        /// Output Parquet file
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            nominal,
            baseline,
            output,
            reference_date,
            series_code,
            start_date,
            end_date,
            verbose,
        } => {
            setup_logging(verbose);

            let mut pipeline_config = match config {
                Some(path) => PipelineConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {:?}", path))?,
                None => PipelineConfig::default(),
            };
            if let Some(path) = nominal {
                pipeline_config.sources.nominal_path = path;
            }
            if let Some(path) = baseline {
                pipeline_config.sources.baseline_path = path;
            }
            if let Some(path) = output {
                pipeline_config.output.path = path;
            }
            if let Some(date) = reference_date {
                pipeline_config.transform.reference_date = date;
            }
            if let Some(code) = series_code {
                pipeline_config.index.series_code = code;
            }
            if let Some(date) = start_date {
                pipeline_config.index.start_date = date;
            }
            if let Some(date) = end_date {
                pipeline_config.index.end_date = date;
            }
            pipeline_config.validate()?;

            run(pipeline_config).await
        }
        Commands::Inspect { input, verbose } => {
            setup_logging(verbose);
            inspect(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn run(config: PipelineConfig) -> Result<()> {
    let ctx = RunContext::now();
    let client = SgsClient::new(config.index.base_url.clone());

    let summary = run_pipeline(&client, &config, &ctx)
        .await
        .context("Pipeline run failed")?;

    info!(
        "Complete: {} rows written to {:?} ({} dates inferred, {} prices forward-filled, {} months without index)",
        summary.rows_written,
        summary.output.output_path,
        summary.dates_filled,
        summary.prices_filled,
        summary.unmatched_index
    );
    info!(
        "Baseline: {} updated, {} inserted, {} without percent change",
        summary.baseline_updated, summary.baseline_inserted, summary.null_percent_changes
    );
    if let Some(path) = &summary.audit.json_path {
        info!("Index payload kept at {:?}", path);
    }
    if let Some(path) = &summary.audit.csv_path {
        info!("Index series kept at {:?}", path);
    }

    Ok(())
}

fn inspect(input: PathBuf) -> Result<()> {
    info!("Reading output from {:?}", input);
    let rows = read_output(&input).context("Failed to read output file")?;

    println!("Output Rows");
    println!("===========");
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    println!();
    println!("Total rows: {}", rows.len());

    Ok(())
}
