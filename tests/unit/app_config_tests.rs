/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use srtai::app_config::{Config, LogLevel, MAX_RETRY_COUNT};
use srtai::translation::retry::MAX_ATTEMPTS;

use crate::common;

fn valid_config() -> Config {
    Config {
        target_language: "fr".to_string(),
        model: "qwen2.5-7b".to_string(),
        ..Config::default()
    }
}

#[test]
fn test_default_shouldUseLocalEndpointAndSmallWindows() {
    let config = Config::default();

    assert_eq!(config.endpoint, "http://localhost:1234/v1");
    assert_eq!(config.window_size, 4);
    assert_eq!(config.translation.max_attempts, MAX_ATTEMPTS);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.api_key.is_empty());
}

#[test]
fn test_validate_withDefaults_shouldRequireTargetAndModel() {
    let config = Config::default();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Target language"));

    let config = Config {
        target_language: "de".to_string(),
        ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Model"));

    assert!(valid_config().validate().is_ok());
}

#[test]
fn test_validate_withZeroWindow_shouldFail() {
    let config = Config {
        window_size: 0,
        ..valid_config()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withTemperatureOutOfRange_shouldFail() {
    let mut config = valid_config();
    config.translation.temperature = 3.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withUnboundedRetryCount_shouldFail() {
    let mut config = valid_config();
    config.translation.retry_count = MAX_RETRY_COUNT;
    assert!(config.validate().is_ok());

    config.translation.retry_count = 1_000;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("retry_count"));
}

#[test]
fn test_endpointUrl_shouldRejectMalformedOrForeignSchemes() {
    let mut config = valid_config();

    config.endpoint = "https://api.openai.com/v1/".to_string();
    assert_eq!(config.endpoint_url().unwrap().as_str(), "https://api.openai.com/v1");

    config.endpoint = "ftp://example.com/v1".to_string();
    assert!(config.endpoint_url().is_err());

    config.endpoint = "not a url".to_string();
    assert!(config.endpoint_url().is_err());
    assert!(config.validate().is_err());
}

#[test]
fn test_loadFromFile_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "srtai.json",
        r#"{
            "target_language": "Brazilian Portuguese",
            "model": "gpt-4o-mini",
            "window_size": 6,
            "translation": { "temperature": 0.1 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_from_file(&path)?;

    assert_eq!(config.target_language, "Brazilian Portuguese");
    assert_eq!(config.window_size, 6);
    assert_eq!(config.translation.temperature, 0.1);
    assert_eq!(config.translation.timeout_secs, 120);
    assert_eq!(config.translation.retry_count, 2);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.endpoint, "http://localhost:1234/v1");
    config.validate()?;
    Ok(())
}

#[test]
fn test_loadFromFile_withBrokenJson_shouldNameTheFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    let err = Config::load_from_file(&path).unwrap_err();

    assert!(format!("{:#}", err).contains("broken.json"));
    Ok(())
}
