//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::embed::{DEFAULT_CONCURRENCY, DEFAULT_LANGUAGE};
use crate::domain::options::{
    DEFAULT_ARCHIVE_PATH, DEFAULT_RUNTIME_PATH, OutputFormat, PlantUmlOptions, RendererPaths,
    ReportMode,
};

pub use cli::{ArgsCommand, CliArgs, Command, EmbedOverrides, RenderArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "plantuml-embed";
const ENV_PREFIX: &str = "PLANTUML_EMBED";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub renderer: RendererPaths,
    pub plantuml: PlantUmlOptions,
    pub embed: EmbedSectionSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct EmbedSectionSettings {
    pub language: String,
    pub concurrency: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Render(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Args(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&EmbedOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    renderer: RawRendererSettings,
    plantuml: RawPlantUmlSettings,
    embed: RawEmbedSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    runtime_path: Option<PathBuf>,
    archive_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPlantUmlSettings {
    format: Option<String>,
    theme: Option<String>,
    dark_mode: Option<bool>,
    charset: Option<String>,
    report_mode: Option<String>,
    verbose: Option<bool>,
    quiet: Option<bool>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmbedSettings {
    language: Option<String>,
    concurrency: Option<u64>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &EmbedOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.runtime_path.as_ref() {
            self.renderer.runtime_path = Some(path.clone());
        }
        if let Some(path) = overrides.archive_path.as_ref() {
            self.renderer.archive_path = Some(path.clone());
        }
        if let Some(language) = overrides.language.as_ref() {
            self.embed.language = Some(language.clone());
        }
        if let Some(limit) = overrides.concurrency {
            self.embed.concurrency = Some(limit);
        }

        self.apply_plantuml_overrides(overrides);
    }

    fn apply_plantuml_overrides(&mut self, overrides: &EmbedOverrides) {
        let plantuml = &mut self.plantuml;
        if let Some(format) = overrides.format.as_ref() {
            plantuml.format = Some(format.clone());
        }
        if let Some(theme) = overrides.theme.as_ref() {
            plantuml.theme = Some(theme.clone());
        }
        if let Some(dark) = overrides.dark_mode {
            plantuml.dark_mode = Some(dark);
        }
        if let Some(charset) = overrides.charset.as_ref() {
            plantuml.charset = Some(charset.clone());
        }
        if let Some(mode) = overrides.report_mode.as_ref() {
            plantuml.report_mode = Some(mode.clone());
        }
        if let Some(verbose) = overrides.plantuml_verbose {
            plantuml.verbose = Some(verbose);
        }
        if let Some(quiet) = overrides.plantuml_quiet {
            plantuml.quiet = Some(quiet);
        }
        if let Some(seconds) = overrides.timeout_seconds {
            plantuml.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            renderer,
            plantuml,
            embed,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let renderer = build_renderer_paths(renderer);
        let plantuml = build_plantuml_options(plantuml)?;
        let embed = build_embed_settings(embed)?;

        Ok(Self {
            logging,
            renderer,
            plantuml,
            embed,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_renderer_paths(renderer: RawRendererSettings) -> RendererPaths {
    let runtime = non_blank_path(renderer.runtime_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNTIME_PATH));
    let archive = non_blank_path(renderer.archive_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_PATH));

    RendererPaths { runtime, archive }
}

fn build_plantuml_options(plantuml: RawPlantUmlSettings) -> Result<PlantUmlOptions, LoadError> {
    let format = plantuml
        .format
        .map(|value| {
            OutputFormat::from_str(&value)
                .map_err(|err| LoadError::invalid("plantuml.format", err.to_string()))
        })
        .transpose()?;

    let report_mode = plantuml
        .report_mode
        .map(|value| {
            ReportMode::from_str(&value)
                .map_err(|err| LoadError::invalid("plantuml.report_mode", err.to_string()))
        })
        .transpose()?;

    let timeout_seconds = plantuml
        .timeout_seconds
        .map(|value| non_zero_u32(value, "plantuml.timeout_seconds"))
        .transpose()?;

    Ok(PlantUmlOptions {
        format,
        theme: non_blank(plantuml.theme),
        dark_mode: plantuml.dark_mode,
        charset: non_blank(plantuml.charset),
        report_mode,
        verbose: plantuml.verbose,
        quiet: plantuml.quiet,
        timeout_seconds,
    })
}

fn build_embed_settings(embed: RawEmbedSettings) -> Result<EmbedSectionSettings, LoadError> {
    let language = match embed.language {
        Some(language) => {
            let trimmed = language.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid("embed.language", "must not be empty"));
            }
            trimmed.to_string()
        }
        None => DEFAULT_LANGUAGE.to_string(),
    };

    let concurrency = match embed.concurrency {
        Some(value) => non_zero_usize(value, "embed.concurrency")?,
        None => DEFAULT_CONCURRENCY,
    };

    Ok(EmbedSectionSettings {
        language,
        concurrency,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_blank_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|path| !path.to_string_lossy().trim().is_empty())
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
