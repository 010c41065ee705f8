use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use catalog_sync::cli::{run, Commands};
use catalog_sync::load_config::{ApiSettings, CliConfig, LogConfig};
use catalog_sync_core::config::SyncConfig;
use serde_json::json;
use tempfile::tempdir;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATA: &str = "\
product_number,name,description,price,stock,weight,ean,active
SW001,First,,29.99,100,0.5,1234567890123,true
SW002,Second,,49.99,50,,,yes
";

fn config_for(server: &MockServer, data_file: &Path) -> CliConfig {
    CliConfig {
        api: ApiSettings {
            base_url: Some(server.uri()),
            username: Some("admin".into()),
            password: Some("shopware".into()),
        },
        sync: SyncConfig::new(data_file),
        logging: LogConfig {
            level: LevelFilter::DEBUG,
            file: None,
        },
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })))
        .mount(server)
        .await;
}

/// SW002 exists remotely, everything else is new.
async fn mount_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/search/product"))
        .and(body_partial_json(json!({ "filter": [{ "value": "SW002" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "remote-2", "productNumber": "SW002" }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/search/product"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_once_creates_new_and_updates_existing() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_search(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/product"))
        .and(body_partial_json(json!({ "productNumber": "SW001" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "new-1" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/product/remote-2"))
        .and(body_partial_json(json!({ "productNumber": "SW002", "active": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let data_file = dir.path().join("products.csv");
    fs::write(&data_file, DATA).unwrap();

    run(Commands::Once, config_for(&server, &data_file))
        .await
        .expect("once should succeed");
}

#[tokio::test]
async fn test_once_fails_when_a_row_fails() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_search(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/product"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad product"))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/product/remote-2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let data_file = dir.path().join("products.csv");
    fs::write(&data_file, DATA).unwrap();

    let err = run(Commands::Once, config_for(&server, &data_file))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("1 of 2 rows failed"), "got: {err}");
}

#[tokio::test]
async fn test_check_reports_rejected_credentials_without_writes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/product"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let data_file = dir.path().join("products.csv");
    fs::write(&data_file, DATA).unwrap();

    let err = run(Commands::Check, config_for(&server, &data_file))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("authentication"), "got: {err:#}");
}

#[tokio::test]
async fn test_init_writes_into_configured_path() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("nested").join("products.csv");

    run(Commands::Init { force: false }, config_for(&server, &data_file))
        .await
        .expect("init should succeed");
    assert!(fs::read_to_string(&data_file).unwrap().contains("SW003"));
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn test_run_emits_command_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.csv");

    let _ = run(Commands::Check, config_for(&server, &missing)).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Starting command")),
        "Expected a 'Starting command' trace event, got: {event_msgs:?}"
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Data file not found")),
        "Expected the missing data file to be logged, got: {event_msgs:?}"
    );
}

#[tokio::test]
async fn test_sync_config_is_logged_once_per_run() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let config = config_for(&server, &dir.path().join("missing.csv"));

    config.trace_loaded();
    let _ = run(Commands::Check, config).await;

    let event_msgs = events.lock().unwrap();
    let count = |needle: &str| event_msgs.iter().filter(|m| m.contains(needle)).count();
    assert_eq!(count("Loaded CliConfig"), 1, "got: {event_msgs:?}");
    assert_eq!(count("Loaded SyncConfig"), 1, "got: {event_msgs:?}");
}
