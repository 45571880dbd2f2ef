//! `importer` — load line-delimited OHLCV files into Redis.
//!
//! Each line becomes one field of a per-symbol hash: the key is the key
//! prefix plus the symbol, the field is the normalized date and the value is
//! a `{O,H,L,C,V}` object.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tyosis_core::{Column, PartialMapping, RunOptions, Store, DEFAULT_DATE_FORMAT};
use tyosis_ingestion::{check_inputs, DatePattern, ImportPipeline, ImportSummary};
use tyosis_store::{fetch_series, ConfigStore, MemoryStore, RedisStore};

/// Rows printed per symbol by `--check`.
const CHECK_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "importer",
    version,
    about = "Import OHLCV text files into a Redis hash per symbol"
)]
struct Cli {
    /// Input files (comma-delimited, one record per line).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Redis host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Redis port.
    #[arg(long, default_value_t = 6379)]
    port: u16,

    /// Redis database number.
    #[arg(long, default_value_t = 0)]
    database: i64,

    /// Normalize date tokens before using them as field keys.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    convert_date: bool,

    /// Pattern for normalized dates (YYYY, YY, MMMM, MMM, MM, M, DD, D).
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,

    /// Only accept ISO-like dates. With `false`, 8-digit dates pass through
    /// and DD/MM/YYYY is accepted.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    strict_dates: bool,

    /// Skip a column-name row at the top of each file.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    skip_header: bool,

    /// Import into an in-memory store instead of connecting to Redis.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Prefix prepended to every symbol key. Remembered between runs.
    #[arg(long)]
    key_prefix: Option<String>,

    #[arg(long)]
    symbol_index: Option<String>,
    #[arg(long)]
    date_index: Option<String>,
    #[arg(long)]
    open_index: Option<String>,
    #[arg(long)]
    high_index: Option<String>,
    #[arg(long)]
    low_index: Option<String>,
    #[arg(long)]
    close_index: Option<String>,
    #[arg(long)]
    volume_index: Option<String>,

    /// Number of files imported at once (default: all available cores).
    #[arg(long)]
    threads: Option<usize>,

    /// After importing, print the first rows of every imported symbol.
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Log every line and upsert.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    /// Typed run options. Malformed index values fail here, before any I/O.
    fn run_options(&self) -> tyosis_core::Result<RunOptions> {
        let overrides = PartialMapping::parse_overrides([
            (Column::Symbol, self.symbol_index.as_deref()),
            (Column::Date, self.date_index.as_deref()),
            (Column::Open, self.open_index.as_deref()),
            (Column::High, self.high_index.as_deref()),
            (Column::Low, self.low_index.as_deref()),
            (Column::Close, self.close_index.as_deref()),
            (Column::Volume, self.volume_index.as_deref()),
        ])?;
        DatePattern::parse(&self.date_format)?;

        Ok(RunOptions {
            key_prefix: self.key_prefix.clone(),
            date_format: self.date_format.clone(),
            convert_date: self.convert_date,
            strict_date_validation: self.strict_dates,
            skip_header: self.skip_header,
            database: self.database,
            overrides,
        })
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn configure_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    if num_threads == 0 {
        anyhow::bail!("Number of threads must be a positive integer");
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

fn print_series(store: &dyn Store, prefix: &str, summary: &ImportSummary) -> Result<()> {
    for symbol in summary.symbols() {
        let series = fetch_series(store, prefix, &symbol)?;
        println!("{}{} ({} dates)", prefix, symbol, series.len());
        for (date, value) in series.iter().take(CHECK_ROWS) {
            match value.decode() {
                Ok(bar) => println!(
                    " - {}: open: {}, high: {}, low: {}, close: {}, vol: {}",
                    date,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume.map_or_else(|| "NaN".to_string(), |v| v.to_string()),
                ),
                Err(_) => println!(" - {}: {}", date, value),
            }
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.run_options()?;
    check_inputs(&cli.inputs)?;

    let store: Box<dyn Store> = if cli.dry_run {
        info!("Dry run: importing {:?} into an in-memory store", cli.inputs);
        Box::new(MemoryStore::new())
    } else {
        info!(
            "Importing data from {:?} to redis server {}:{} database {}",
            cli.inputs, cli.host, cli.port, cli.database
        );
        Box::new(RedisStore::connect(&cli.host, cli.port)?)
    };

    let config_store = ConfigStore::new(store.as_ref());
    let pipeline = ImportPipeline::new(&config_store, &options)?;

    let summary = match cli.threads {
        Some(n) => configure_thread_pool(n)?.install(|| pipeline.run(&cli.inputs))?,
        None => pipeline.run(&cli.inputs)?,
    };

    if cli.check {
        print_series(store.as_ref(), &pipeline.config().key_prefix, &summary)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<tyosis_core::Error>()
                .map_or(255, tyosis_core::Error::exit_code);
            ExitCode::from(code)
        }
    }
}
