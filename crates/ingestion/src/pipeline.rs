//! Import pipeline.
//!
//! Each input source moves through `Opened -> Streaming -> Closed`. Every line
//! is decoded, its date normalized, its values encoded and the result upserted
//! under `(prefix + symbol, date)`. The first upsert of every source is read
//! back; an empty read-back stops the run.
//!
//! Sources are imported in parallel on the rayon pool. The first fatal error
//! raises an abort flag that stops sibling sources before their next line;
//! writes they already issued stay in the store.
//!
//! Lines are decoded as UTF-8; invalid sequences are replaced rather than
//! failing the source.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use tyosis_core::{storage_key, Error, Result, RunConfig, RunOptions, Store};
use tyosis_store::ConfigStore;

use crate::codec::{looks_like_header, Decoded, RecordCodec, SkipReason};
use crate::date::{DateNormalizer, DatePattern};

/// Lifecycle of one input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// A line reader is attached.
    Opened,
    /// Lines are being processed.
    Streaming,
    /// The source is exhausted.
    Closed,
}

/// Per-source counters.
#[derive(Debug, Clone)]
pub struct SourceStats {
    /// Source name (usually the file path).
    pub source: String,
    pub state: SourceState,
    pub lines_read: u64,
    pub records_upserted: u64,
    pub lines_skipped: u64,
    /// Upserts the store rejected after the first one.
    pub failed_writes: u64,
    /// Symbols with at least one successful upsert.
    pub symbols: BTreeSet<String>,
}

impl SourceStats {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            state: SourceState::Opened,
            lines_read: 0,
            records_upserted: 0,
            lines_skipped: 0,
            failed_writes: 0,
            symbols: BTreeSet::new(),
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub sources: Vec<SourceStats>,
}

impl ImportSummary {
    pub fn records_upserted(&self) -> u64 {
        self.sources.iter().map(|s| s.records_upserted).sum()
    }

    pub fn lines_skipped(&self) -> u64 {
        self.sources.iter().map(|s| s.lines_skipped).sum()
    }

    pub fn failed_writes(&self) -> u64 {
        self.sources.iter().map(|s| s.failed_writes).sum()
    }

    /// Every symbol written in the run.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .flat_map(|s| s.symbols.iter().cloned())
            .collect()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} source(s), {} record(s) upserted, {} line(s) skipped, {} failed write(s), {} symbol(s)",
            self.sources.len(),
            self.records_upserted(),
            self.lines_skipped(),
            self.failed_writes(),
            self.symbols().len()
        )
    }
}

/// Per-source bookkeeping while streaming.
struct SourceImport {
    stats: SourceStats,
    header_checked: bool,
    verified: bool,
}

impl SourceImport {
    fn open(source: &str) -> Self {
        debug!("{}: opened", source);
        Self {
            stats: SourceStats::new(source),
            header_checked: false,
            verified: false,
        }
    }

    fn start(&mut self) {
        self.stats.state = SourceState::Streaming;
    }

    fn date_error(&self, token: &str, line: &str, line_number: u64) -> Error {
        Error::DateParse {
            token: token.to_string(),
            line: line.to_string(),
            source_name: self.stats.source.clone(),
            line_number,
        }
    }

    fn close(mut self) -> SourceStats {
        self.stats.state = SourceState::Closed;
        info!(
            "{}: closed after {} line(s), {} upserted, {} skipped",
            self.stats.source,
            self.stats.lines_read,
            self.stats.records_upserted,
            self.stats.lines_skipped
        );
        self.stats
    }
}

/// Fail with `InputNotFound` for the first path that does not exist.
pub fn check_inputs(inputs: &[PathBuf]) -> Result<()> {
    match inputs.iter().find(|p| !p.exists()) {
        Some(missing) => Err(Error::InputNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Streams sources into the store under a frozen run configuration.
pub struct ImportPipeline<'a, S: Store + ?Sized> {
    store: &'a S,
    config: RunConfig,
    codec: RecordCodec,
    dates: DateNormalizer,
    abort: AtomicBool,
}

impl<'a, S: Store + ?Sized> ImportPipeline<'a, S> {
    /// Select the database, merge and persist the configuration, and freeze
    /// it for the run.
    pub fn new(config_store: &ConfigStore<'a, S>, options: &RunOptions) -> Result<Self> {
        DatePattern::parse(&options.date_format)?;
        let store = config_store.store();
        store.select(options.database)?;
        let config = config_store.prepare(options)?;
        Self::with_config(store, config)
    }

    /// Build a pipeline from an already merged configuration.
    pub fn with_config(store: &'a S, config: RunConfig) -> Result<Self> {
        let pattern = DatePattern::parse(&config.date_format)?;
        Ok(Self {
            store,
            codec: RecordCodec::new(config.mapping),
            dates: DateNormalizer::new(config.convert_date, config.strict_date_validation, pattern),
            config,
            abort: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Import every input in parallel.
    ///
    /// Returns the first fatal error in input order, if any. The abort flag is
    /// cleared on entry, so a pipeline can be run again after a failed run.
    pub fn run(&self, inputs: &[PathBuf]) -> Result<ImportSummary> {
        check_inputs(inputs)?;
        self.abort.store(false, Ordering::SeqCst);
        info!("Importing {} source(s)", inputs.len());

        let results: Vec<Result<SourceStats>> = inputs
            .par_iter()
            .map(|path| {
                let result = self.import_path(path);
                if let Err(err) = &result {
                    if !matches!(err, Error::Aborted) {
                        self.abort.store(true, Ordering::SeqCst);
                    }
                }
                result
            })
            .collect();

        let mut summary = ImportSummary::default();
        let mut aborted = false;
        for result in results {
            match result {
                Ok(stats) => summary.sources.push(stats),
                Err(Error::Aborted) => aborted = true,
                Err(err) => return Err(err),
            }
        }
        if aborted {
            return Err(Error::Aborted);
        }

        info!("Import complete: {}", summary);
        Ok(summary)
    }

    /// Import one file.
    pub fn import_path(&self, path: &Path) -> Result<SourceStats> {
        let file = File::open(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::InputNotFound(path.to_path_buf()),
            _ => Error::Io(err),
        })?;
        self.import_reader(&path.display().to_string(), BufReader::new(file))
    }

    /// Import one line-oriented source.
    pub fn import_reader<R: BufRead>(&self, source: &str, mut reader: R) -> Result<SourceStats> {
        let mut import = SourceImport::open(source);
        import.start();

        let mut buf = Vec::new();
        let mut line_number = 0u64;
        loop {
            if self.abort.load(Ordering::SeqCst) {
                warn!("{}: stopping, another source failed", source);
                return Err(Error::Aborted);
            }
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;

            let line = String::from_utf8_lossy(strip_line_ending(&buf));
            if let Cow::Owned(_) = line {
                warn!("{}:{}: invalid UTF-8 replaced", source, line_number);
            }
            self.process_line(&mut import, &line, line_number)?;
        }

        Ok(import.close())
    }

    fn process_line(&self, import: &mut SourceImport, line: &str, line_number: u64) -> Result<()> {
        import.stats.lines_read += 1;

        let header_candidate = !import.header_checked && !line.trim().is_empty();
        if header_candidate {
            import.header_checked = true;
        }
        let decoded = if header_candidate && self.config.skip_header && looks_like_header(line) {
            Decoded::Skip(SkipReason::Header)
        } else {
            self.codec.decode(line)
        };

        let record = match decoded {
            Decoded::Record(record) => record,
            Decoded::Skip(reason) => {
                match reason {
                    SkipReason::Blank => debug!("Empty line"),
                    SkipReason::Header => debug!("Header line: {}", line),
                    SkipReason::MissingDate if self.config.convert_date => {
                        error!("No date token in line: {}", line);
                        return Err(import.date_error("", line, line_number));
                    }
                    SkipReason::MissingDate | SkipReason::MissingSymbol => warn!(
                        "{}:{}: not enough columns, skipping: {}",
                        import.stats.source, line_number, line
                    ),
                }
                import.stats.lines_skipped += 1;
                return Ok(());
            }
        };
        debug!("{}", line);

        let Some(field) = self.dates.normalize(&record.date) else {
            error!("Unrecognized date format: {}", record.date);
            error!("In line: {}", line);
            error!("Please consider converting the date into a simple ISO standard format first, such as YYYY-MM-DD");
            return Err(import.date_error(&record.date, line, line_number));
        };

        let key = storage_key(&self.config.key_prefix, &record.symbol);
        let value = RecordCodec::encode(&record);
        match self.store.upsert(&key, &field, value.as_str()) {
            Ok(()) => {
                debug!("{} inserted", key);
                import.stats.records_upserted += 1;
                import.stats.symbols.insert(record.symbol);
            }
            Err(err) if !import.verified => {
                let err = Error::verification(&key, &field, err.to_string());
                error!("{}", err);
                return Err(err);
            }
            Err(err) => {
                warn!("Failed to write {} {}: {}", key, field, err);
                import.stats.failed_writes += 1;
            }
        }

        if !import.verified {
            self.verify(&key, &field)?;
            import.verified = true;
        }
        Ok(())
    }

    fn verify(&self, key: &str, field: &str) -> Result<()> {
        let outcome = match self.store.get_field(key, field) {
            Ok(Some(value)) if !value.is_empty() => return Ok(()),
            Ok(_) => Error::verification(key, field, "read-back returned no value"),
            Err(err) => Error::verification(key, field, err.to_string()),
        };
        error!("{}", outcome);
        Err(outcome)
    }
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
