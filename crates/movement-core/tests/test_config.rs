use movement_core::config::MovementConfig;
use std::io::Write;

#[test]
fn test_parse_credentials_json_with_aliases() {
    let json = r#"{
        "data_service": {
            "url": "https://data.example.com",
            "token": "anon-key"
        },
        "session": {
            "company_id": "acme",
            "user_id": "u-42"
        }
    }"#;

    let config = MovementConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.data_service.base_url, "https://data.example.com", "url should map to base_url");
    assert_eq!(config.data_service.api_key, "anon-key", "token should map to api_key");
    assert_eq!(config.data_service.schema, "public", "schema should have default value");
    assert_eq!(config.data_service.timeout_secs, 30, "timeout should have default value");
    assert!(config.catalog.cache_enabled, "catalog cache should default to enabled");

    let ctx = config.session_context();
    assert_eq!(ctx.company_id.as_str(), "acme");
    assert_eq!(ctx.user_id.unwrap().as_str(), "u-42");
}

#[test]
fn test_explicit_values_override_defaults() {
    let json = r#"{
        "data_service": {
            "base_url": "https://data.example.com",
            "api_key": "service-key",
            "schema": "operaciones",
            "timeout_secs": 5
        },
        "session": { "company_id": "acme" },
        "catalog": { "cache_enabled": false }
    }"#;

    let config = MovementConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.data_service.schema, "operaciones");
    assert_eq!(config.data_service.timeout_secs, 5);
    assert!(!config.catalog.cache_enabled);
    assert!(config.session.user_id.is_none());
}

#[test]
fn test_missing_api_key_is_rejected() {
    let json = r#"{
        "data_service": { "url": "https://data.example.com", "token": "" },
        "session": { "company_id": "acme" }
    }"#;

    let result = MovementConfig::from_json_str(json);
    assert!(result.is_err(), "Should fail with empty API key");

    let err = result.unwrap_err();
    assert!(err.to_string().contains("required"), "Error should mention a required field: {}", err);
}

#[test]
fn test_missing_company_is_rejected() {
    let json = r#"{
        "data_service": { "url": "https://data.example.com", "token": "anon-key" },
        "session": { "company_id": "  " }
    }"#;

    let err = MovementConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("company_id is required"));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "data_service": {{ "url": "https://data.example.com", "token": "file-key" }},
            "session": {{ "company_id": "acme" }}
        }}"#
    )
    .unwrap();

    let config = MovementConfig::from_file(file.path()).expect("Failed to load config file");
    assert_eq!(config.data_service.api_key, "file-key");
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MovementConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
