/*!
 * Integration tests for the controller's file and folder workflows
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use vitranslate::Controller;
use vitranslate::app_controller::{FileStatus, ISSUES_LOG_NAME};
use vitranslate::errors::AppError;
use vitranslate::file_utils::MediaType;
use vitranslate::providers::mock::MockProvider;

use crate::common;
use crate::common::mock_providers::{PhraseBookProvider, StaticExtractor};

fn controller(provider: &PhraseBookProvider) -> Controller {
    let mut config = common::offline_config();
    config.chunking.max_chars = 80;
    Controller::with_provider(config, Arc::new(provider.clone()))
}

#[test]
fn test_with_config_withOfflineConfig_shouldBuildOllamaPipeline() {
    let controller = Controller::with_config(common::offline_config()).unwrap();
    assert_eq!(controller.orchestrator().provider_name(), "ollama");
    assert!(controller.orchestrator().cache().is_enabled());
}

#[test]
fn test_with_config_withCacheDisabled_shouldDisableCache() {
    let mut config = common::offline_config();
    config.cache.enabled = false;
    let controller = Controller::with_config(config).unwrap();
    assert!(!controller.orchestrator().cache().is_enabled());
}

#[tokio::test]
async fn test_run_withTextFile_shouldWriteTranslationNextToInput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "article.md", &common::sample_article())?;
    let provider = PhraseBookProvider::for_sample_article();

    let status = controller(&provider)
        .run(input, dir.path().to_path_buf(), false)
        .await?;

    let output = dir.path().join("article.vi.txt");
    match status {
        FileStatus::Translated { output: written, stats, rate_limited } => {
            assert_eq!(written, output);
            assert_eq!(stats.failed, 0);
            assert!(!rate_limited);
        }
        other => panic!("unexpected status {:?}", other),
    }
    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("Thị trấn ven sông"));
    assert_eq!(content.lines().count(), 5);
    assert!(!dir.path().join(ISSUES_LOG_NAME).exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "article.txt", &common::sample_article())?;
    let existing = common::create_test_file(dir.path(), "article.vi.txt", "old translation")?;
    let provider = PhraseBookProvider::for_sample_article();
    let controller = controller(&provider);

    let skipped = controller.run(input.clone(), dir.path().to_path_buf(), false).await?;
    assert_eq!(skipped, FileStatus::Skipped { output: existing.clone() });
    assert_eq!(fs::read_to_string(&existing)?, "old translation");
    assert!(provider.requests().is_empty());

    let forced = controller.run(input, dir.path().to_path_buf(), true).await?;
    assert!(matches!(forced, FileStatus::Translated { .. }));
    assert_ne!(fs::read_to_string(&existing)?, "old translation");
    Ok(())
}

#[tokio::test]
async fn test_run_twice_withForce_shouldReuseCachedChunks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "article.txt", &common::sample_article())?;
    let provider = PhraseBookProvider::for_sample_article();
    let controller = controller(&provider);

    controller.run(input.clone(), dir.path().to_path_buf(), true).await?;
    let calls = provider.requests().len();
    let second = controller.run(input, dir.path().to_path_buf(), true).await?;

    assert_eq!(provider.requests().len(), calls);
    match second {
        FileStatus::Translated { stats, .. } => assert_eq!(stats.cache_hits, stats.chunks),
        other => panic!("unexpected status {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withPdfInputWithoutExtractor_shouldReportUnsupported() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "scan.pdf", "%PDF-1.7")?;
    let provider = PhraseBookProvider::for_sample_article();

    let error = controller(&provider)
        .run(input, dir.path().to_path_buf(), false)
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<AppError>(), Some(AppError::UnsupportedInput(_))));
    assert!(provider.requests().is_empty());
    Ok(())
}

#[test]
fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let provider = PhraseBookProvider::for_sample_article();

    let result = tokio_test::block_on(async {
        controller(&provider)
            .run(dir.path().join("missing.txt"), dir.path().to_path_buf(), false)
            .await
    });

    assert!(result.is_err());
    assert!(provider.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_shouldTranslateTextFilesAndLogFailures() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "one.txt", &common::sample_article())?;
    common::create_test_file(
        dir.path(),
        "chapters/two.md",
        "Children run between the stalls.\n\nThis sentence is not in the phrase book and will fail.",
    )?;
    common::create_test_file(dir.path(), "ignored.pdf", "%PDF-1.7")?;
    let provider = PhraseBookProvider::for_sample_article();

    let summary = controller(&provider)
        .run_folder(dir.path().to_path_buf(), false)
        .await?;

    assert_eq!(summary.translated, 2);
    assert_eq!(summary.incomplete, 1);
    assert_eq!(summary.errors, 0);
    assert!(dir.path().join("one.vi.txt").exists());

    let two = fs::read_to_string(dir.path().join("chapters/two.vi.txt"))?;
    let lines: Vec<&str> = two.lines().collect();
    assert_eq!(lines[0], "Trẻ em chạy giữa các sạp hàng.");
    assert!(lines[1].starts_with("[translation failed (segment 2)]"));

    let issues = fs::read_to_string(dir.path().join("chapters").join(ISSUES_LOG_NAME))?;
    assert!(issues.contains("not in the phrase book"));
    Ok(())
}

#[tokio::test]
async fn test_run_folder_secondPass_shouldSkipOutputsAndTranslations() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "one.txt", &common::sample_article())?;
    let provider = PhraseBookProvider::for_sample_article();
    let controller = controller(&provider);

    controller.run_folder(dir.path().to_path_buf(), false).await?;
    let summary = controller.run_folder(dir.path().to_path_buf(), false).await?;

    assert_eq!(summary.translated, 0);
    assert_eq!(summary.skipped, 1);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withoutTextFiles_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "scan.pdf", "%PDF-1.7")?;
    let provider = PhraseBookProvider::for_sample_article();

    assert!(controller(&provider).run_folder(dir.path().to_path_buf(), false).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_withImageInput_shouldTranslateExtractedText() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = dir.path().join("menu.jpg");
    fs::write(&input, [0xffu8, 0xd8, 0xff, 0xe0])?;
    let provider = PhraseBookProvider::for_sample_article();
    let extractor = StaticExtractor::returning(&common::sample_article());

    let status = controller(&provider)
        .with_extractor(Arc::new(extractor.clone()))
        .run(input, dir.path().to_path_buf(), false)
        .await?;

    assert!(matches!(status, FileStatus::Translated { .. }));
    let content = fs::read_to_string(dir.path().join("menu.vi.txt"))?;
    assert!(content.starts_with("Thị trấn ven sông"));

    let inputs = extractor.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].name, "menu.jpg");
    assert_eq!(inputs[0].media_type, MediaType::Jpeg);
    assert_eq!(inputs[0].bytes, vec![0xff, 0xd8, 0xff, 0xe0]);
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingExtractor_shouldFailWithoutOutput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "scan.pdf", "%PDF-1.7")?;
    let provider = PhraseBookProvider::for_sample_article();

    let result = controller(&provider)
        .with_extractor(Arc::new(StaticExtractor::failing()))
        .run(input, dir.path().to_path_buf(), false)
        .await;

    let error = result.unwrap_err();
    assert!(format!("{:#}", error).contains("Unable to process input image"));
    assert!(!dir.path().join("scan.vi.txt").exists());
    assert!(provider.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withExtractor_shouldIncludeImagesAndPdfs() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "one.txt", &common::sample_article())?;
    common::create_test_file(dir.path(), "scans/page.pdf", "%PDF-1.7")?;
    common::create_test_file(dir.path(), "scans/photo.png", "PNG")?;
    common::create_test_file(dir.path(), "scans/ignored.gif", "GIF89a")?;
    let provider = PhraseBookProvider::for_sample_article();
    let extractor = StaticExtractor::returning("Children run between the stalls.");

    let summary = controller(&provider)
        .with_extractor(Arc::new(extractor.clone()))
        .run_folder(dir.path().to_path_buf(), false)
        .await?;

    assert_eq!(summary.translated, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(extractor.inputs().len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("scans/photo.vi.txt"))?,
        "Trẻ em chạy giữa các sạp hàng."
    );
    Ok(())
}

#[tokio::test]
async fn test_check_provider_shouldReflectBackendHealth() {
    let config = common::offline_config();

    let healthy = Controller::with_provider(config.clone(), Arc::new(MockProvider::working()));
    assert!(healthy.check_provider().await.is_ok());

    let broken = Controller::with_provider(config, Arc::new(MockProvider::failing()));
    let error = broken.check_provider().await.unwrap_err();
    assert!(format!("{:#}", error).contains("not reachable"));
}
