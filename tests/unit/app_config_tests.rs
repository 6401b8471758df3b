/*!
 * Tests for application configuration functionality
 */

use cuecards::app_config::{Config, CueChangePolicy, LogLevel};
use cuecards::clock::ClockSampler;
use log::LevelFilter;
use std::time::Duration;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.service.endpoint, "http://localhost:8000");
    assert_eq!(config.service.timeout_secs, 60);
    assert_eq!(config.playback.tick_interval_ms, 250);
    assert_eq!(config.playback.cue_change_policy, CueChangePolicy::Text);
    assert!(config.generation.custom_themes.is_empty());
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(config, Config::default());

    // A second load reads the file written by the first
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded, config);
    Ok(())
}

#[test]
fn test_loadOrCreate_withExistingFile_shouldReadOverrides() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"service":{"endpoint":"https://cards.example.com"},"playback":{"tick_interval_ms":100},"generation":{"custom_themes":["cooking"]}}"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.service.endpoint, "https://cards.example.com");
    assert_eq!(config.service.timeout_secs, 60);
    assert_eq!(config.generation.themes(), Some(vec!["cooking".to_string()]));
    assert_eq!(ClockSampler::from_config(&config.playback).period(), Duration::from_millis(100));
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_withZeroTimeout_shouldFail() {
    let mut config = Config::default();
    config.service.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_logLevel_shouldMapToLevelFilter() {
    assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);
    assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::Trace);
}
