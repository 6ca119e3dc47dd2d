use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the plantuml-embed binary.
#[derive(Debug, Parser)]
#[command(
    name = "plantuml-embed",
    version,
    about = "Render fenced PlantUML blocks in markdown into inline images"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PLANTUML_EMBED_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Embed diagrams into a markdown document.
    Render(RenderArgs),
    /// Print the renderer argument sequence the current settings produce.
    #[command(name = "args")]
    Args(ArgsCommand),
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: EmbedOverrides,

    /// Markdown file to read; standard input when omitted.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// File to write the result to; standard output when omitted.
    #[arg(long, short = 'o', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Emit HTML instead of CommonMark.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ArgsCommand {
    #[command(flatten)]
    pub overrides: EmbedOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct EmbedOverrides {
    /// Override the runtime executable used to launch the renderer.
    #[arg(long = "runtime-path", value_name = "PATH")]
    pub runtime_path: Option<PathBuf>,

    /// Override the renderer archive passed to the runtime.
    #[arg(long = "archive-path", value_name = "PATH")]
    pub archive_path: Option<PathBuf>,

    /// Override the output format (png|svg).
    #[arg(long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Override the diagram theme.
    #[arg(long = "theme", value_name = "NAME")]
    pub theme: Option<String>,

    /// Toggle dark mode rendering.
    #[arg(
        long = "dark-mode",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub dark_mode: Option<bool>,

    /// Override the charset used to read diagram sources.
    #[arg(long = "charset", value_name = "NAME")]
    pub charset: Option<String>,

    /// Override the renderer report mode (off|brief|verbose).
    #[arg(long = "report-mode", value_name = "MODE")]
    pub report_mode: Option<String>,

    /// Toggle verbose renderer output.
    #[arg(
        long = "plantuml-verbose",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub plantuml_verbose: Option<bool>,

    /// Toggle quiet renderer output.
    #[arg(
        long = "plantuml-quiet",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub plantuml_quiet: Option<bool>,

    /// Override the renderer-side timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the fence language whose blocks are rendered.
    #[arg(long = "language", value_name = "TAG")]
    pub language: Option<String>,

    /// Override the maximum number of renders in flight.
    #[arg(long = "concurrency", value_name = "COUNT")]
    pub concurrency: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
