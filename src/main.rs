// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use yakusu::app_config::{self, CacheBackend, Config};
use yakusu::errors::AppError;
use yakusu::translation::cache::{SystemClock, create_cache_repository};
use yakusu::translation::segmenter::Segmenter;
use yakusu::TranslationService;

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

/// CLI Wrapper for CacheBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliCacheBackend {
    Auto,
    Memory,
    Persistent,
}

impl From<CliCacheBackend> for CacheBackend {
    fn from(cli_backend: CliCacheBackend) -> Self {
        match cli_backend {
            CliCacheBackend::Auto => CacheBackend::Auto,
            CliCacheBackend::Memory => CacheBackend::Memory,
            CliCacheBackend::Persistent => CacheBackend::Persistent,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Options shared by every command that reads the configuration
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Source language code ('en' or 'ja')
    #[arg(short, long, visible_alias = "source")]
    source_language: Option<String>,

    /// Target language code ('en' or 'ja')
    #[arg(short, long, visible_alias = "target")]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// LM Studio base URL, e.g. http://localhost:1234/v1
    #[arg(long, env = "YAKUSU_ENDPOINT")]
    endpoint: Option<String>,

    /// Cache backend to use
    #[arg(long, value_enum)]
    cache: Option<CliCacheBackend>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text read from the argument or stdin
    Translate {
        /// Text to translate; stdin is read when absent
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        /// Request id reported in logs; a random one is used when absent
        #[arg(long)]
        id: Option<String>,

        /// Print the full result as JSON instead of one line per segment
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show how text would be segmented
    Segment {
        /// Text to segment; stdin is read when absent
        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },

    /// Print translation cache statistics
    CacheStats {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove every translation cache entry
    CacheClear {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Check that the LM Studio server answers
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for yakusu
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// yakusu - sentence-level translation through LM Studio
///
/// Splits text into sentences, translates them in batches through a local
/// OpenAI-compatible server and caches every translated sentence.
#[derive(Parser, Debug)]
#[command(name = "yakusu")]
#[command(version)]
#[command(about = "Cached English/Japanese translation through a local LM Studio server")]
#[command(long_about = "yakusu translates text between English and Japanese with a local LM Studio server.

EXAMPLES:
    yakusu translate \"Hello world. Good night.\"     # Translate using default config
    echo 'こんにちは。' | yakusu translate -s ja -t en  # Translate stdin
    yakusu translate -m qwen2.5-7b --json \"Hi.\"      # Use a specific model, JSON output
    yakusu segment \"One. Two? Three!\"                # Show segmentation only
    yakusu cache-stats                               # Inspect the translation cache
    yakusu check --log-level debug                   # Probe the server
    yakusu completions bash > yakusu.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
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
    // Install the logger at trace and narrow it with set_max_level below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yakusu", &mut std::io::stdout());
            Ok(())
        }
        Commands::Segment { text } => run_segment(text),
        Commands::Translate { text, id, json, common } => {
            let config = load_config(&common)?;
            run_translate(&config, text, id, json).await
        }
        Commands::CacheStats { common } => {
            let config = load_config(&common)?;
            run_cache_stats(&config).await
        }
        Commands::CacheClear { common } => {
            let config = load_config(&common)?;
            run_cache_clear(&config).await
        }
        Commands::Check { common } => {
            let config = load_config(&common)?;
            run_check(&config).await
        }
    }
}

/// Load or create the configuration file and apply CLI overrides
fn load_config(options: &CommonArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path.display()
        );
        let config = Config::default();
        config
            .save(config_path)
            .context("Failed to write default config")?;
        config
    };

    // Override config with CLI options if provided
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(model) = &options.model {
        config.client.model = model.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.client.endpoint = endpoint.clone();
    }
    if let Some(backend) = &options.cache {
        config.cache.backend = backend.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    debug!("Using configuration from {}", config_path.display());
    Ok(config)
}

fn read_input(text: Option<String>) -> Result<String, AppError> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn run_segment(text: Option<String>) -> Result<()> {
    let input = read_input(text)?;
    let mut stdout = std::io::stdout();
    for segment in Segmenter::new().split(&input) {
        writeln!(stdout, "{}\t{}", segment.id, segment.text)?;
    }
    Ok(())
}

async fn run_translate(config: &Config, text: Option<String>, id: Option<String>, json: bool) -> Result<()> {
    let input = read_input(text)?;
    let lang_pair = config.lang_pair()?;
    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let service = TranslationService::from_config(config).map_err(AppError::from)?;
    info!(
        "Translating {} with {} at {}",
        lang_pair, config.client.model, config.client.endpoint
    );

    let result = service
        .translate_text(&id, &input, lang_pair)
        .await
        .map_err(AppError::from)?;

    let mut stdout = std::io::stdout();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        for item in &result.items {
            writeln!(stdout, "{}", item.translated)?;
        }
    }
    Ok(())
}

async fn run_cache_stats(config: &Config) -> Result<()> {
    let cache = create_cache_repository(&config.cache, Arc::new(SystemClock))
        .map_err(|e| anyhow!("Failed to open translation cache: {}", e))?;
    let stats = cache
        .stats()
        .await
        .map_err(|e| anyhow!("Failed to read cache statistics: {}", e))?;

    println!("backend:   {}", cache.backend_name());
    println!("entries:   {}", stats.entry_count);
    println!("bytes:     {} / {}", stats.estimated_bytes, config.cache.max_bytes);
    println!("ttl:       {}s", config.cache.ttl_secs);
    Ok(())
}

async fn run_cache_clear(config: &Config) -> Result<()> {
    let cache = create_cache_repository(&config.cache, Arc::new(SystemClock))
        .map_err(|e| anyhow!("Failed to open translation cache: {}", e))?;
    let removed = cache
        .clear()
        .await
        .map_err(|e| anyhow!("Failed to clear cache: {}", e))?;
    info!("Removed {} cached translations from the {} cache", removed, cache.backend_name());
    Ok(())
}

async fn run_check(config: &Config) -> Result<()> {
    let service = TranslationService::from_config(config).map_err(AppError::from)?;
    service
        .test_connection()
        .await
        .map_err(AppError::from)
        .with_context(|| format!("LM Studio at {} is not reachable", config.client.endpoint))?;
    info!("LM Studio at {} answered with model {}", config.client.endpoint, config.client.model);
    Ok(())
}
