use std::{path::Path, process};

use plantuml_embed::{
    application::{
        embed::{DiagramEmbedder, EmbedSettings, MarkdownOutput},
        error::AppError,
    },
    config,
    infra::{error::InfraError, telemetry},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Render(config::RenderArgs::default()));

    telemetry::init(&settings.logging)?;
    let embedder = DiagramEmbedder::new(EmbedSettings::from(&settings));

    match command {
        config::Command::Render(args) => run_render(&embedder, args).await,
        config::Command::Args(_) => run_show_args(&embedder).await,
    }
}

async fn run_render(
    embedder: &DiagramEmbedder,
    args: config::RenderArgs,
) -> Result<(), AppError> {
    let markdown = read_input(args.input.as_deref()).await?;
    let input = args
        .input
        .as_deref()
        .map_or_else(|| "-".to_string(), |path| path.display().to_string());
    let output = if args.html {
        MarkdownOutput::Html
    } else {
        MarkdownOutput::CommonMark
    };

    let rendered = embedder.embed_markdown(&markdown, output).await?;

    info!(
        target = "plantuml_embed::render",
        input = %input,
        discovered = rendered.summary.discovered,
        rendered = rendered.summary.rendered,
        failed = rendered.summary.failed,
        "Document rendered"
    );

    write_output(args.output.as_deref(), rendered.document.as_bytes()).await
}

async fn run_show_args(embedder: &DiagramEmbedder) -> Result<(), AppError> {
    let arguments = embedder.arguments()?;

    let mut line = embedder.settings().paths.runtime.to_string_lossy().into_owned();
    for argument in arguments.iter() {
        line.push(' ');
        line.push_str(&argument.to_string_lossy());
    }
    line.push('\n');

    write_output(None, line.as_bytes()).await
}

async fn read_input(path: Option<&Path>) -> Result<String, AppError> {
    let markdown = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(InfraError::from)?;
            buffer
        }
    };
    Ok(markdown)
}

async fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), AppError> {
    match path {
        Some(path) => tokio::fs::write(path, bytes)
            .await
            .map_err(InfraError::from)?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await.map_err(InfraError::from)?;
            stdout.flush().await.map_err(InfraError::from)?;
        }
    }
    Ok(())
}
