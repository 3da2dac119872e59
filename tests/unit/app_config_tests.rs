/*!
 * Tests for configuration loading, defaults and validation
 */

use std::fs;
use std::time::Duration;

use vitranslate::app_config::{Config, DispatchMode, LogLevel, TranslationProvider};
use vitranslate::translation::{ChunkPolicy, Dispatch, OrchestratorOptions};

use crate::common;

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.target_language, "vi");
    let reloaded = Config::from_file(&path)?;
    assert_eq!(reloaded.chunking.max_chars, config.chunking.max_chars);
    assert_eq!(reloaded.translation.provider, TranslationProvider::Gemini);
    Ok(())
}

#[test]
fn test_load_or_create_withExistingFile_shouldNotOverwrite() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "source_language": "en",
            "target_language": "vi",
            "translation": { "provider": "ollama" },
            "chunking": { "max_chars": 800, "policy": "word" },
            "dispatch": { "mode": "sequential" },
            "cache": { "enabled": false },
            "log_level": "debug"
        }"#,
    )?;
    let before = fs::read_to_string(&path)?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(fs::read_to_string(&path)?, before);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.chunking.max_chars, 800);
    assert_eq!(config.chunking.policy, ChunkPolicy::Word);
    assert_eq!(config.dispatch.mode, DispatchMode::Sequential);
    assert!(!config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_from_file_withInvalidJson_shouldFail() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json")?;
    assert!(Config::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let mut config = common::offline_config();
    assert!(config.validate().is_ok());
    config.target_language = "xx".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroChunkTimeout_shouldFail() {
    let mut config = common::offline_config();
    config.dispatch.chunk_timeout_secs = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_orchestrator_options_fromDefaults_shouldUseGeminiProfile() {
    let options = OrchestratorOptions::from_config(&Config::default());
    assert_eq!(options.dispatch, Dispatch::Concurrent { max_in_flight: 3 });
    assert_eq!(options.max_chunk_chars, 1500);
    assert_eq!(options.min_translatable_chars, 5);
    assert_eq!(options.retry.max_retries, 0);
    assert_eq!(options.request_timeout, Duration::from_secs(60));
}

#[test]
fn test_orchestrator_options_withOverrides_shouldFollowConfig() {
    let mut config = common::offline_config();
    config.dispatch.concurrent_requests = Some(5);
    config.dispatch.chunk_timeout_secs = Some(9);
    let options = OrchestratorOptions::from_config(&config);
    assert_eq!(options.dispatch, Dispatch::Concurrent { max_in_flight: 5 });
    assert_eq!(options.request_timeout, Duration::from_secs(9));

    config.dispatch.mode = DispatchMode::Sequential;
    assert_eq!(OrchestratorOptions::from_config(&config).dispatch, Dispatch::Sequential);
}

#[test]
fn test_log_level_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
}
