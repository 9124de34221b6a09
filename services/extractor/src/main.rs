//! Field extractor command-line tool.
//!
//! Loads the dataset registry from a TOML configuration, regrids every
//! configured scalar and vector variable onto a caller-specified
//! lat/lon target grid, and writes the results to a Zarr store.
//!
//! Variables no dataset can supply are logged and omitted; storage
//! failures while reading a resolved dataset abort the run.

mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use grid_common::{time::parse_iso8601, BoundingBox};
use regrid::{vector, Field, Sources, SourcesConfig, Target};

#[derive(Parser, Debug)]
#[command(name = "extractor")]
#[command(about = "Regrid configured datasets onto a target grid")]
struct Args {
    /// Sources configuration file
    #[arg(long, default_value = "sources.toml")]
    sources: PathBuf,

    /// Target bounding box in degrees: xmin,xmax,ymin,ymax
    #[arg(long)]
    bbox: String,

    /// Number of target grid columns
    #[arg(long, default_value = "100")]
    nx: usize,

    /// Number of target grid rows
    #[arg(long, default_value = "100")]
    ny: usize,

    /// Start of the time interval (ISO 8601, default: 24h ago)
    #[arg(long = "from")]
    from: Option<String>,

    /// End of the time interval (ISO 8601, inclusive, default: now)
    #[arg(long = "to")]
    to: Option<String>,

    /// Only use datasets whose name contains this (repeatable)
    #[arg(short = 'd', long = "dataset-filter")]
    dataset_filters: Vec<String>,

    /// Only extract variables whose name contains this (repeatable)
    #[arg(short = 'v', long = "variable-filter")]
    variable_filters: Vec<String>,

    /// Output Zarr store path (omit for a dry run)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(args)
}

fn run(args: Args) -> Result<()> {
    let bbox = BoundingBox::parse(&args.bbox).context("parsing --bbox")?;
    let target = Target::new(bbox, args.nx, args.ny)?;

    let now = Utc::now();
    let t0 = parse_time(args.from.as_deref(), now - Duration::days(1)).context("parsing --from")?;
    let t1 = parse_time(args.to.as_deref(), now).context("parsing --to")?;
    info!(%t0, %t1, nx = args.nx, ny = args.ny, "extraction target");

    let mut config = SourcesConfig::load(&args.sources)
        .with_context(|| format!("loading {}", args.sources.display()))?;
    config.retain_datasets(&args.dataset_filters);
    config.retain_variables(&args.variable_filters);

    let sources = Sources::from_config(&config)?;
    info!(datasets = sources.datasets().len(), "sources ready");

    let mut fields: Vec<Field> = Vec::new();

    for var in &sources.scalar_variables {
        match sources.find_dataset_for_var(var) {
            Some((dataset, handle)) => {
                let field = dataset.regrid(&handle, &target, t0, t1)?;
                fields.push(field);
            }
            None => {
                error!(variable = %var, "no dataset provides variable, omitting");
            }
        }
    }

    for pair in &sources.vector_variables {
        match sources.find_dataset_for_var_pair(&pair.x, &pair.y) {
            Some((dataset, hx, hy)) => {
                let fx = dataset.regrid(&hx, &target, t0, t1)?;
                let fy = dataset.regrid(&hy, &target, t0, t1)?;
                fields.push(vector::magnitude(&pair.name, &fx, &fy)?);
            }
            None => {
                error!(
                    x_component = %pair.x,
                    y_component = %pair.y,
                    "no dataset provides both vector components, omitting"
                );
            }
        }
    }

    for field in &fields {
        let (nt, ny, nx) = field.shape();
        info!(
            variable = %field.name,
            shape = ?(nt, ny, nx),
            missing = field.missing_count(),
            "extracted"
        );
    }

    match &args.output {
        Some(path) => {
            output::write_store(path, &target, &fields)?;
            info!(fields = fields.len(), output = %path.display(), "extraction complete");
        }
        None => {
            info!(fields = fields.len(), "dry run, no output written");
        }
    }

    Ok(())
}

fn parse_time(value: Option<&str>, default: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match value {
        Some(s) => Ok(parse_iso8601(s)?),
        None => Ok(default),
    }
}
