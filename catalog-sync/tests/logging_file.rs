use std::env;
use std::fs;

use catalog_sync::load_config::LogConfig;
use catalog_sync::logging;
use tempfile::tempdir;
use tracing::level_filters::LevelFilter;

// Installs the global subscriber, so this file holds a single test.
#[test]
fn log_file_receives_plain_filtered_events() {
    env::remove_var("RUST_LOG");
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("catalog_sync.log");

    logging::init(&LogConfig {
        level: LevelFilter::INFO,
        file: Some(path.clone()),
    })
    .expect("logging should initialise");

    tracing::info!(product_number = "SW001", "written to the log file");
    tracing::error!("errors are kept too");
    tracing::debug!("below the configured level");

    let content = fs::read_to_string(&path).expect("log file exists");
    assert!(content.contains("written to the log file"), "got: {content}");
    assert!(content.contains("SW001"), "got: {content}");
    assert!(content.contains("errors are kept too"), "got: {content}");
    assert!(!content.contains("below the configured level"), "got: {content}");
    assert!(!content.contains('\u{1b}'), "log file must not carry ANSI codes");
}
