//! The path-based entry points, sync and bridged-async, against real files.

use futures::StreamExt;
use ops::CancellationToken;
use reader::csv::CsvOptions;
use reader::json::JsonOptions;
use reader::{ReadOptions, ReadError};
use serde::Deserialize;
use std::io::Write;

#[derive(Debug, PartialEq, Deserialize)]
struct City {
    city: String,
    region: String,
}

fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn csv_files_read_asynchronously() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let dir = tempfile::tempdir()?;
    let path = write_temp(
        &dir,
        "cities.csv",
        "city,region\nSouthborough,MA\nNorthbridge,MA\n",
    );

    let stream = reader::read::csv::<City>(&path, CsvOptions::default())?;
    let cities: Vec<City> = stream.map(Result::unwrap).collect().await;
    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].city, "Southborough");
    Ok(())
}

#[tokio::test]
async fn json_files_read_asynchronously_with_progress_length() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "points.json", r#"[{"city": "a", "region": "b"}]"#);

    let stream = reader::read::json::<City>(&path, JsonOptions::default()).unwrap();
    let out: Vec<City> = stream.map(Result::unwrap).collect().await;
    assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn text_files_read_line_by_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "lines.txt", "alpha\nbeta\n");
    let lines: Vec<String> = reader::read::text(&path, ReadOptions::default())
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(lines, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn a_cancelled_token_ends_an_async_read_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "cities.csv", "city,region\na,b\n");

    let token = CancellationToken::new();
    token.cancel();
    let options = CsvOptions {
        common: ReadOptions::new().with_cancellation(token),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let stream = reader::read::csv::<City>(&path, options).unwrap();
    let out: Vec<Result<City, ReadError>> = stream.collect().await;
    assert!(out.is_empty());
    assert!(metrics.completed().is_none());
}

#[test]
fn missing_files_error_at_open() {
    let err = reader::read::csv_sync::<City>("/definitely/not/here.csv", CsvOptions::default());
    assert!(matches!(err, Err(ReadError::Io(_))));
}
