//! Configuration file loading.

use std::io::Write;
use std::time::Duration;

use pretty_assertions::assert_eq;
use toolturn::config::TurnConfig;
use toolturn::error::ToolturnError;

#[test]
fn file_values_override_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[upstream]
base_url = "http://localhost:9999/v1"
max_attempts = 3

[tools]
clamp_limit = 5
timeout_ms = 1500
max_concurrency = 2

[search]
max_results = 9
brave_api_key = "brave-key"
"#
    )
    .unwrap();

    let config = TurnConfig::from_file(file.path()).unwrap();

    assert_eq!(config.upstream.base_url, "http://localhost:9999/v1");
    assert_eq!(config.retry_policy().max_attempts, 3);
    assert_eq!(config.upstream.timeout_secs, 120);

    let options = config.turn_options();
    assert_eq!(options.clamp_limit, 5);
    assert_eq!(options.tool_timeout, Duration::from_millis(1500));
    assert_eq!(options.max_concurrency, 2);

    // Out-of-range result counts are pulled back into 1..=5.
    assert_eq!(config.build_registry().max_results(), 5);
    assert_eq!(config.search.brave_api_key.as_deref(), Some("brave-key"));
    assert_eq!(config.server.bind, "127.0.0.1:8000");
}

#[test]
fn malformed_file_names_the_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[tools]\nclamp_limit = \"many\"").unwrap();

    let err = TurnConfig::from_file(file.path()).unwrap_err();

    assert!(matches!(err, ToolturnError::Configuration(_)));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TurnConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ToolturnError::Io(_)));
}

#[test]
fn setters_win_over_file_values() {
    let config = TurnConfig::from_toml_str("[tools]\nclamp_limit = 5\n")
        .unwrap()
        .with_clamp_limit(2)
        .with_tool_timeout(Duration::from_secs(9))
        .with_api_key("sk-explicit");

    assert_eq!(config.turn_options().clamp_limit, 2);
    assert_eq!(config.turn_options().tool_timeout, Duration::from_secs(9));
    assert_eq!(config.api_key(), Some("sk-explicit"));
    assert!(config.build_controller().is_ok());
}
