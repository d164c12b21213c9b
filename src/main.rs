// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use yadtwai::app_config::{self, API_KEY_ENV, Config, DEFAULT_CONFIG_PATH, resolve_api_key};
use yadtwai::app_controller::Controller;
use yadtwai::file_utils::FileManager;
use yadtwai::pipeline::{FailurePolicy, Placement};
use yadtwai::translation::available_backends;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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

/// CLI Wrapper for FailurePolicy to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFailurePolicy {
    Marker,
    Omit,
    Abort,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli_policy: CliFailurePolicy) -> Self {
        match cli_policy {
            CliFailurePolicy::Marker => FailurePolicy::Marker,
            CliFailurePolicy::Omit => FailurePolicy::Omit,
            CliFailurePolicy::Abort => FailurePolicy::Abort,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a Word document paragraph by paragraph (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for yadtwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// List the available translation backends
    Backends,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input .docx document
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug, Default)]
struct TranslateOptions {
    /// Output document (default: "[translated] <input name>" next to the input)
    #[arg(short, long, value_name = "OUTPUT_PATH")]
    output: Option<PathBuf>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation backend to use (see `yadtwai backends`)
    #[arg(short, long)]
    backend: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key (overrides the YADTWAI_API_KEY environment variable and the config file)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'ja', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Insert each translation after its original paragraph instead of before
    #[arg(long)]
    after: bool,

    /// What to do when a paragraph cannot be translated
    #[arg(long, value_enum)]
    on_failure: Option<CliFailurePolicy>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// yadtwai - Yet Another Document Translator with AI
///
/// Translates Word documents paragraph by paragraph with an LLM chat backend,
/// inserting each translation next to its original paragraph.
#[derive(Parser, Debug)]
#[command(name = "yadtwai")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "AI-powered bilingual document translation tool")]
#[command(long_about = "yadtwai translates .docx documents paragraph by paragraph using an OpenAI-compatible chat backend.
Each translation is inserted as a new, coloured paragraph right before (or after) its original.

EXAMPLES:
    yadtwai report.docx                          # Translate using default config (en -> zh)
    yadtwai -f report.docx                       # Force overwrite an existing output
    yadtwai -b openai -m gpt-4o report.docx      # Use a specific backend and model
    yadtwai -s en -t ja -o out.docx report.docx  # Translate from English to Japanese
    yadtwai --after report.docx                  # Put translations after the originals
    yadtwai backends                             # List available backends
    yadtwai completions bash > yadtwai.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

API KEY:
    Taken from --api-key, then the YADTWAI_API_KEY environment variable, then the
    config file. No key is built in.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input .docx document
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
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
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
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
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
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
    // Start at info; the level is updated once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yadtwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Backends) => {
            list_backends();
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            run_translate(TranslateArgs {
                input_path,
                options: cli.options,
            })
            .await
        }
    }
}

fn list_backends() {
    let mut stdout = std::io::stdout();
    for spec in available_backends() {
        let _ = writeln!(
            stdout,
            "{:<14} {:<12} {:<28} {}{}",
            spec.id,
            spec.display_name,
            spec.default_endpoint,
            spec.default_model,
            if spec.requires_credential { "" } else { "  (no API key needed)" }
        );
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateOptions, env_api_key: Option<&str>) {
    if let Some(backend) = &options.backend {
        config.translation.backend = backend.clone();
    }
    if let Some(model) = &options.model {
        config.translation.set_model(model);
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if options.after {
        config.document.placement = Placement::After;
    }
    if let Some(policy) = options.on_failure {
        config.document.on_failure = policy.into();
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }

    let api_key = resolve_api_key(options.api_key.as_deref(), env_api_key, &config.translation.get_api_key());
    config.translation.set_api_key(&api_key);
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let options = &args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = options.log_level {
        let level: app_config::LogLevel = cmd_log_level.into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = Path::new(&options.config_path);
    let (mut config, created) = Config::load_or_create(config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", config_path.display());
    }

    let env_api_key = std::env::var(API_KEY_ENV).ok();
    apply_overrides(&mut config, options, env_api_key.as_deref());

    // Validate the configuration after loading and overriding
    config.validate().map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| FileManager::default_output_path(&args.input_path));

    let controller = Controller::with_config(config)?;
    let report = controller
        .run(args.input_path.clone(), output_path, options.force_overwrite)
        .await?;

    if !report.is_clean() {
        info!("{} paragraphs are marked as untranslated in the output", report.failed);
    }

    Ok(())
}
