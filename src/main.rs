//! ncagg - read filenames from standard input and print an NcML aggregation.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ncagg::aggregation::{AggregationBuilder, AggregationType, AttributeAggregator, BuildOptions};
use ncagg::ncml;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ncagg")]
#[command(
    about = "Read filenames of datasets from standard input and print an NcML aggregation",
    long_about = None
)]
struct Args {
    /// The dimension along which to aggregate
    #[arg(short, long, default_value = "time")]
    dimension: String,

    /// Open files to read coordinate values to include in the NcML
    #[arg(short, long)]
    cache: bool,

    /// Aggregation type (joinNew, joinExisting, tiled, union)
    #[arg(short = 't', long = "type", default_value = "joinExisting")]
    aggregation_type: AggregationType,

    /// Global attribute to set, of the form '<attr>=<value>'. Can be given multiple times
    #[arg(short, long = "global-attr", value_name = "ATTR=VALUE")]
    global_attr: Vec<String>,

    /// Global attribute to remove. Can be given multiple times
    #[arg(short, long = "remove-attr", value_name = "ATTR")]
    remove_attr: Vec<String>,

    /// Global attribute computed across files, e.g. 'date_created=max'.
    /// Reducers: first, last, min, max, unique. Can be given multiple times
    #[arg(short, long = "aggregate-attr", value_name = "ATTR=REDUCER")]
    aggregate_attr: Vec<String>,

    /// Enable logging to specified file
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = init_logging(&args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }

    if let Err(err) = run(&args) {
        tracing::error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) -> Result<()> {
    // Set up logging to a file if --log option is provided, stderr otherwise
    if let Some(log_path) = &args.log {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_writer(io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    tracing::info!("Starting ncagg");
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let options = build_options(args)?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read file list from standard input")?;
    let file_list: Vec<&str> = input.lines().filter(|line| !line.is_empty()).collect();

    let builder = AggregationBuilder::netcdf(args.dimension.as_str()).with_type(args.aggregation_type);
    let output = builder.build(&file_list, &options)?;

    let xml = ncml::to_xml_string(&output.document)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", xml)?;

    tracing::info!(
        "Wrote aggregation of {} files with {} warnings",
        file_list.len(),
        output.diagnostics.len()
    );
    Ok(())
}

/// Split `<attr>=<value>`. Exactly one `=` is allowed.
fn parse_global_attr(attr_string: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = attr_string.split('=').map(str::trim).collect();
    match parts.as_slice() {
        [attr, value] => Ok((*attr, *value)),
        _ => bail!(
            "Invalid global attribute '{}'. Should be of the form '<attr>=<value>'",
            attr_string
        ),
    }
}

fn build_options(args: &Args) -> Result<BuildOptions> {
    let mut options = BuildOptions::new().cache(args.cache);

    for attr_string in &args.global_attr {
        let (attr, value) = parse_global_attr(attr_string)?;
        options = options.global_attr(attr, value);
    }

    for attr in &args.remove_attr {
        options = options.remove_attr(attr.as_str());
    }

    for spec in &args.aggregate_attr {
        let aggregator: AttributeAggregator = spec.parse()?;
        options = options.aggregate_attr(aggregator);
    }

    Ok(options)
}
