// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use vitranslate::Controller;
use vitranslate::app_config::{self, Config, DispatchMode, TranslationProvider};
use vitranslate::app_controller::FileStatus;
use vitranslate::translation::ChunkPolicy;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Gemini,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for ChunkPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliChunkPolicy {
    Paragraph,
    Word,
}

impl From<CliChunkPolicy> for ChunkPolicy {
    fn from(cli_policy: CliChunkPolicy) -> Self {
        match cli_policy {
            CliChunkPolicy::Paragraph => ChunkPolicy::Paragraph,
            CliChunkPolicy::Word => ChunkPolicy::Word,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text file, an image or PDF (Gemini), a folder, or stdin ("-")
    Translate(TranslateArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input text, image or PDF file, directory, or "-" for stdin
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

/// Flags that override the configuration file
#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Output directory (output file when reading stdin)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing translations
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name for the selected provider
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code
    #[arg(short, long)]
    target_language: Option<String>,

    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Log level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Character budget per chunk
    #[arg(long)]
    max_chars: Option<usize>,

    /// Chunk splitting policy
    #[arg(long, value_enum)]
    policy: Option<CliChunkPolicy>,

    /// Maximum simultaneous backend calls (1-5)
    #[arg(long, conflicts_with = "sequential")]
    concurrency: Option<usize>,

    /// Translate one chunk at a time
    #[arg(long)]
    sequential: bool,

    /// Disable the translation cache
    #[arg(long)]
    no_cache: bool,

    /// Check that the provider answers before translating
    #[arg(long)]
    check: bool,

    /// API key for hosted providers
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "vitranslate")]
#[command(version)]
#[command(about = "Chunked English to Vietnamese text translation with AI providers")]
#[command(long_about = "vitranslate splits long texts into chunks, translates them with an AI provider \
(Gemini or a local Ollama model) and reassembles the result in order.

Examples:
  vitranslate translate notes.md
  vitranslate translate ./docs --concurrency 3 -f
  cat chapter.txt | vitranslate translate - --provider ollama")]
#[command(args_conflicts_with_subcommands = true)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input text file, directory, or "-" for stdin
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger; verbosity is controlled by the max level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "vitranslate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args.input_path, args.options).await,
        None => {
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            run_translate(input_path, cli.options).await
        }
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateOptions) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(api_key) = &options.api_key {
        if config.translation.provider.requires_api_key() {
            config.translation.active_provider_config_mut().api_key = api_key.clone();
        }
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(max_chars) = options.max_chars {
        config.chunking.max_chars = max_chars;
    }
    if let Some(policy) = &options.policy {
        config.chunking.policy = policy.clone().into();
    }
    if options.sequential {
        config.dispatch.mode = DispatchMode::Sequential;
    }
    if let Some(concurrency) = options.concurrency {
        config.dispatch.mode = DispatchMode::Concurrent;
        config.dispatch.concurrent_requests = Some(concurrency);
    }
    if options.no_cache {
        config.cache.enabled = false;
    }
}

async fn run_translate(input_path: PathBuf, options: TranslateOptions) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    if options.check {
        controller.check_provider().await?;
    }

    if input_path.as_os_str() == "-" {
        controller.run_stdin(options.output.clone()).await?;
        return Ok(());
    }

    if input_path.is_file() {
        let output_dir = match &options.output {
            Some(dir) => dir.clone(),
            None => input_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        match controller.run(input_path, output_dir, options.force_overwrite).await? {
            FileStatus::Translated { stats, .. } => info!(
                "{} chunk(s): {} translated by the provider, {} from cache, {} skipped, {} failed",
                stats.chunks,
                stats.chunks - stats.cache_hits - stats.skipped - stats.failed,
                stats.cache_hits,
                stats.skipped,
                stats.failed
            ),
            FileStatus::Skipped { output } => info!("Existing translation kept: {}", output.display()),
        }
    } else if input_path.is_dir() {
        if options.output.is_some() {
            warn!("--output is ignored in folder mode; translations are written next to their inputs");
        }
        controller.run_folder(input_path, options.force_overwrite).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
