use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::{FileManager, FileType, MEDIA_EXTENSIONS, MediaInput, MediaType, TEXT_EXTENSIONS};
use crate::providers::{self, Provider, TextExtractor};
use crate::translation::{
    CachePolicy, OrchestratorOptions, OutcomeStats, TranslationCache, TranslationOrchestrator, TranslationOutcome,
};

// @module: Application controller for text translation

/// Name of the per-folder log that collects failed segments
pub const ISSUES_LOG_NAME: &str = "vitranslate.issues.log";

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Translation written to `output`
    Translated {
        output: PathBuf,
        stats: OutcomeStats,
        rate_limited: bool,
    },
    /// Output already existed and overwriting was not requested
    Skipped { output: PathBuf },
}

/// Counters for a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Files whose output contains at least one failed segment
    pub incomplete: usize,
}

/// Main application controller for text translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Pipeline shared by every file of a run
    orchestrator: TranslationOrchestrator,
    // @field: Reads images and PDFs, when the provider can
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl Controller {
    // @method: Create a controller with the configured backend
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = providers::build_provider(&config.translation)
            .context("Failed to initialize translation provider")?;
        let extractor = providers::build_extractor(&config.translation)
            .context("Failed to initialize text extractor")?;

        let controller = Self::with_provider(config, provider);
        Ok(match extractor {
            Some(extractor) => controller.with_extractor(extractor),
            None => controller,
        })
    }

    /// Create a controller around an existing backend
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        let cache = Self::build_cache(&config);
        let options = OrchestratorOptions::from_config(&config);
        let orchestrator = TranslationOrchestrator::new(provider, cache, options);
        Self {
            config,
            orchestrator,
            extractor: None,
        }
    }

    /// Accept images and PDFs, reading their text with `extractor`
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    fn build_cache(config: &Config) -> TranslationCache {
        if !config.cache.enabled {
            return TranslationCache::new(false);
        }
        TranslationCache::with_policy(CachePolicy {
            max_entries: config.cache.max_entries,
            ttl: config.cache.ttl(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &TranslationOrchestrator {
        &self.orchestrator
    }

    /// Send one small request to check the provider answers
    pub async fn check_provider(&self) -> Result<()> {
        info!("Checking connection to {}", self.orchestrator.provider_name());
        self.orchestrator
            .test_connection()
            .await
            .with_context(|| format!("Provider {} is not reachable", self.orchestrator.provider_name()))?;
        info!("Provider {} is ready", self.orchestrator.provider_name());
        Ok(())
    }

    /// Translate an in-memory text without progress output
    pub async fn translate_text(&self, text: &str) -> TranslationOutcome {
        self.orchestrator.translate_all(text).await
    }

    /// Translate one file into `output_dir`
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<FileStatus> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<FileStatus> {
        let start_time = Instant::now();

        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let file_type = FileManager::detect_file_type(input_file)?;
        match &file_type {
            FileType::PlainText => {}
            FileType::Media(media_type) if self.extractor.is_none() => {
                return Err(AppError::UnsupportedInput(format!(
                    "{} input needs a provider that reads images and PDFs (gemini): {:?}",
                    media_type, input_file
                ))
                .into());
            }
            FileType::Media(_) => {}
            FileType::Unsupported(ext) => {
                return Err(AppError::UnsupportedInput(format!(
                    "'.{}' files must be converted to plain text first: {:?}",
                    ext, input_file
                ))
                .into());
            }
            FileType::Unknown => {
                return Err(AppError::UnsupportedInput(format!("not a UTF-8 text file: {:?}", input_file)).into());
            }
        }

        FileManager::ensure_dir(output_dir)?;
        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(FileStatus::Skipped { output: output_path });
        }

        let text = match file_type {
            FileType::Media(media_type) => self.extract_media(input_file, media_type).await?,
            _ => FileManager::read_to_string(input_file)?,
        };
        let outcome = self.translate_with_progress(&text, multi_progress).await;

        FileManager::write_to_file(&output_path, &outcome.render())?;
        self.report_failures(&outcome, input_file, output_dir);

        let stats = outcome.stats();
        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );

        Ok(FileStatus::Translated {
            output: output_path,
            stats,
            rate_limited: outcome.has_rate_limit_failure(),
        })
    }

    async fn translate_with_progress(&self, text: &str, multi_progress: &MultiProgress) -> TranslationOutcome {
        let total_chunks = self.orchestrator.chunks(text).len() as u64;
        let progress_bar = multi_progress.add(ProgressBar::new(total_chunks));
        progress_bar.set_style(Self::progress_style("chunks"));

        info!(
            "vitranslate: {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let outcome = self
            .orchestrator
            .translate_all_with_progress(text, move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await;

        progress_bar.finish_and_clear();
        outcome
    }

    async fn extract_media(&self, input_file: &Path, media_type: MediaType) -> Result<String> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or_else(|| AppError::UnsupportedInput(format!("no text extractor for {:?}", input_file)))?;

        let input = MediaInput::read(input_file, media_type)?;
        info!("Extracting text from {} ({})", input.name, media_type);
        let text = extractor
            .extract_text(&input)
            .await
            .with_context(|| format!("Failed to extract text from {:?}", input_file))?;

        if text.trim().is_empty() {
            warn!("No readable text found in {:?}", input_file);
        }
        Ok(text)
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| {
                ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}")
            })
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    /// Warn about failed segments and append them to the issues log
    fn report_failures(&self, outcome: &TranslationOutcome, input_file: &Path, log_dir: &Path) {
        let failed = outcome.failures().count();
        if failed == 0 {
            return;
        }

        warn!(
            "{} of {} segment(s) of {:?} failed; the output contains error markers",
            failed,
            outcome.segments().len(),
            input_file
        );
        if outcome.has_rate_limit_failure() {
            warn!("The provider reported an exhausted quota. Wait a while and rerun with -f to retry.");
        }

        let log_path = log_dir.join(ISSUES_LOG_NAME);
        for failure in outcome.failures() {
            let line = format!("{}: {}", input_file.display(), failure);
            if let Err(e) = FileManager::append_to_log_file(&log_path, &line) {
                warn!("Failed to write issues log {:?}: {}", log_path, e);
                break;
            }
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every text file below `input_dir`, writing each output next to its input
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let target = &self.config.target_language;
        let mut extensions = TEXT_EXTENSIONS.to_vec();
        if self.extractor.is_some() {
            extensions.extend_from_slice(MEDIA_EXTENSIONS);
        }
        let text_files: Vec<PathBuf> = FileManager::find_files(&input_dir, &extensions)?
            .into_iter()
            .filter(|path| !FileManager::is_translation_output(path, target))
            .collect();

        if text_files.is_empty() {
            return Err(anyhow!("No text files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(text_files.len() as u64));
        folder_pb.set_style(Self::progress_style("files"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for text_file in &text_files {
            let file_name = text_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = text_file.parent().map(Path::to_path_buf).unwrap_or_else(|| input_dir.clone());

            match self
                .run_with_progress(text_file, &output_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(FileStatus::Translated { stats, .. }) => {
                    summary.translated += 1;
                    if stats.failed > 0 {
                        summary.incomplete += 1;
                    }
                }
                Ok(FileStatus::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} translated ({} with failed segments), {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.translated,
            summary.incomplete,
            summary.skipped,
            summary.errors
        );

        Ok(summary)
    }

    /// Translate standard input, writing to `output` or standard output
    pub async fn run_stdin(&self, output: Option<PathBuf>) -> Result<OutcomeStats> {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read standard input")?;

        let outcome = self.orchestrator.translate_all(&text).await;
        let rendered = outcome.render();

        match output {
            Some(path) => FileManager::write_to_file(&path, &rendered)?,
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(rendered.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        if !outcome.is_complete() {
            warn!("{} segment(s) failed; the output contains error markers", outcome.failures().count());
            if outcome.has_rate_limit_failure() {
                warn!("The provider reported an exhausted quota. Wait a while and retry.");
            }
        }

        Ok(outcome.stats())
    }
}
