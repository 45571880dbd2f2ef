//! File-based imports across several sources.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tyosis_core::{Error, RunOptions, Store, CONFIG_KEY};
use tyosis_ingestion::{ImportPipeline, SourceState};
use tyosis_store::{fetch_series, ConfigStore, MemoryStore};

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_imports_multiple_sources() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write(
            &dir,
            "aapl.csv",
            "Symbol,Date,Open,High,Low,Close,Volume\n\
             AAPL,2020-01-02,300.1,300.5,298.0,299.9,1000000\n\
             AAPL,2020-01-03,297.2,300.6,296.5,297.4,36633900\n",
        ),
        write(
            &dir,
            "msft.csv",
            "MSFT,2020-01-02,158.8,160.7,158.3,160.6,22622100\n\n",
        ),
    ];

    let store = MemoryStore::new();
    let options = RunOptions {
        key_prefix: Some("us:".into()),
        ..Default::default()
    };
    let pipeline = ImportPipeline::new(&ConfigStore::new(&store), &options).unwrap();
    let summary = pipeline.run(&inputs).unwrap();

    assert_eq!(summary.sources.len(), 2);
    assert!(summary.sources.iter().all(|s| s.state == SourceState::Closed));
    assert_eq!(summary.records_upserted(), 3);
    assert_eq!(summary.lines_skipped(), 2);
    assert_eq!(
        summary.symbols().into_iter().collect::<Vec<_>>(),
        vec!["AAPL".to_string(), "MSFT".to_string()]
    );

    let series = fetch_series(&store, "us:", "AAPL").unwrap();
    let dates: Vec<&str> = series.keys().map(String::as_str).collect();
    assert_eq!(dates, vec!["20200102", "20200103"]);
    assert_eq!(series["20200103"].decode().unwrap().volume, Some(36_633_900));

    assert_eq!(
        store.get_field(CONFIG_KEY, "key-prefix").unwrap().as_deref(),
        Some("us:")
    );
}

#[test]
fn test_bad_date_in_one_source_fails_run() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write(&dir, "good.csv", "AAPL,2020-01-02,1,1,1,1,1\n"),
        write(&dir, "bad.csv", "MSFT,2020-01-02,1,1,1,1,1\nMSFT,not-a-date,1,1,1,1,1\n"),
    ];

    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(&ConfigStore::new(&store), &RunOptions::default()).unwrap();
    let err = pipeline.run(&inputs).unwrap_err();

    assert_eq!(err.exit_code(), 1);
    match err {
        Error::DateParse { token, source_name, .. } => {
            assert_eq!(token, "not-a-date");
            assert!(source_name.ends_with("bad.csv"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_input_checked_before_import() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.csv", "AAPL,2020-01-02,1,1,1,1,1\n");
    let missing = dir.path().join("missing.csv");

    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(&ConfigStore::new(&store), &RunOptions::default()).unwrap();
    let err = pipeline.run(&[good, missing.clone()]).unwrap_err();

    assert!(matches!(err, Error::InputNotFound(ref p) if *p == missing));
    assert!(store.get_all("AAPL").unwrap().is_empty());
}

#[test]
fn test_failed_source_stops_sibling() {
    let dir = TempDir::new().unwrap();
    let healthy: String = (1..=28)
        .map(|d| format!("MSFT,2020-02-{d:02},1,1,1,1,1\n"))
        .collect();
    let inputs = vec![
        write(&dir, "bad.csv", "AAPL,not-a-date,1,1,1,1,1\n"),
        write(&dir, "healthy.csv", &healthy),
    ];

    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(&ConfigStore::new(&store), &RunOptions::default()).unwrap();
    // One worker imports the sources in input order.
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let err = pool.install(|| pipeline.run(&inputs)).unwrap_err();

    assert!(matches!(err, Error::DateParse { .. }));
    assert!(store.get_all("MSFT").unwrap().is_empty());
}

#[test]
fn test_pipeline_reusable_after_failed_run() {
    let dir = TempDir::new().unwrap();
    let bad = write(&dir, "bad.csv", "AAPL,not-a-date,1,1,1,1,1\n");
    let good = write(&dir, "good.csv", "AAPL,2020-01-02,1,1,1,1,1\n");

    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(&ConfigStore::new(&store), &RunOptions::default()).unwrap();
    assert!(pipeline.run(&[bad]).is_err());

    let summary = pipeline.run(&[good]).unwrap();
    assert_eq!(summary.records_upserted(), 1);
    assert!(store.get_field("AAPL", "20200102").unwrap().is_some());
}
