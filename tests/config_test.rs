//! Config file loading tests

use process_event_relay::config::RelayConfig;
use process_event_relay::Category;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"{
            "buffer": true,
            "buffer_seconds": 3,
            "queue_max": 50,
            "process_name": "api",
            "error": true,
            "restart": true,
            "webhook_url_logs": "https://chat.example/hooks/logs",
            "webhook_url_errors": "https://chat.example/hooks/errors"
        }"#,
    );

    let config = RelayConfig::from_file(file.path()).unwrap();

    assert_eq!(config.buffer_seconds, 3);
    assert_eq!(config.queue_max, 50);
    assert_eq!(config.process_name.as_deref(), Some("api"));
    assert!(config.is_enabled(&Category::Error));
    assert!(config.lifecycle_enabled("restart"));
    assert!(config.has_webhooks());
}

#[test]
fn test_out_of_range_values_fall_back() {
    let file = write_config(r#"{"buffer_seconds": 9, "queue_max": 5}"#);
    let config = RelayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.buffer_seconds, 1);
    assert_eq!(config.queue_max, 100);
}

#[test]
fn test_loosely_typed_numbers_still_load() {
    let file = write_config(
        r#"{"buffer_seconds": "3", "queue_max": 50.0, "process_name": "api", "webhook_url_logs": "https://chat.example/hooks/logs"}"#,
    );
    let config = RelayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.buffer_seconds, 3);
    assert_eq!(config.queue_max, 50);
    // 其余字段照常生效
    assert_eq!(config.process_name.as_deref(), Some("api"));
    assert!(config.webhook_url_logs.is_some());
}

#[test]
fn test_wrong_number_types_fall_back() {
    let file = write_config(r#"{"buffer_seconds": false, "queue_max": "lots", "process_name": "api"}"#);
    let config = RelayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.buffer_seconds, 1);
    assert_eq!(config.queue_max, 100);
    assert_eq!(config.process_name.as_deref(), Some("api"));
}

#[test]
fn test_invalid_json_is_an_error() {
    let file = write_config("{ not json");
    let err = RelayConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(RelayConfig::load(Some(&missing)).is_err());
}
