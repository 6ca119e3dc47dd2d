mod args;
mod markdown;
mod plantuml;
mod transform;

use std::{num::NonZeroUsize, path::Path, time::Instant};

use comrak::{Arena, nodes::AstNode};
use tracing::{info, warn};

use crate::application::embed::types::{
    DiagramRenderer, EmbedConfigError, EmbedSummary, RenderArguments,
};
use crate::domain::options::{PlantUmlOptions, RendererPaths};

pub use args::build_arguments;
pub use markdown::{MarkdownOutput, RenderedMarkdown, default_options};
pub use plantuml::PlantUmlProcess;
pub use transform::DIAGRAM_ALT_TEXT;

/// Fence language whose blocks are rendered by default.
pub const DEFAULT_LANGUAGE: &str = "plantuml";

/// Renders admitted into flight at once when nothing else is configured.
pub const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Everything one embedding pass needs. Fixed for the lifetime of a
/// [`DiagramEmbedder`] and reused by every pass it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedSettings {
    pub options: PlantUmlOptions,
    pub paths: RendererPaths,
    /// Fence language tag selecting eligible blocks, compared ignoring ASCII case.
    pub language: String,
    /// Upper bound on renders in flight at the same time.
    pub concurrency: NonZeroUsize,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            options: PlantUmlOptions::default(),
            paths: RendererPaths::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<&crate::config::Settings> for EmbedSettings {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            options: settings.plantuml.clone(),
            paths: settings.renderer.clone(),
            language: settings.embed.language.clone(),
            concurrency: settings.embed.concurrency,
        }
    }
}

/// Replaces eligible fenced blocks of a comrak tree with rendered images.
pub struct DiagramEmbedder<R = PlantUmlProcess> {
    settings: EmbedSettings,
    renderer: R,
}

impl DiagramEmbedder<PlantUmlProcess> {
    /// Embedder that runs the configured renderer runtime once per diagram.
    pub fn new(settings: EmbedSettings) -> Self {
        let renderer = PlantUmlProcess::new(settings.paths.runtime.clone());
        Self { settings, renderer }
    }
}

impl<R: DiagramRenderer> DiagramEmbedder<R> {
    pub fn with_renderer(settings: EmbedSettings, renderer: R) -> Self {
        Self { settings, renderer }
    }

    pub fn settings(&self) -> &EmbedSettings {
        &self.settings
    }

    /// Argument sequence every render of a pass receives.
    pub fn arguments(&self) -> Result<RenderArguments, EmbedConfigError> {
        let archive = self.validate()?;
        let options = self.settings.options.clone().with_defaults();
        Ok(build_arguments(archive, &options))
    }

    /// Render every eligible block under `root` and substitute it in place.
    ///
    /// Resolves only once every discovered block has been replaced, either by
    /// an image or by an error message. Individual render failures never fail
    /// the pass; only an unusable configuration does, before anything runs.
    pub async fn embed<'a>(
        &self,
        arena: &'a Arena<'a>,
        root: &'a AstNode<'a>,
    ) -> Result<EmbedSummary, EmbedConfigError> {
        let started_at = Instant::now();
        let arguments = self.arguments()?;
        let format = self.settings.options.output_format();

        let requests = transform::collect_requests(root, &self.settings.language);
        if requests.is_empty() {
            return Ok(EmbedSummary::default());
        }

        let summary = transform::render_requests(
            arena,
            requests,
            &self.renderer,
            &arguments,
            format,
            self.settings.concurrency,
        )
        .await;

        if summary.failed > 0 {
            warn!(
                target = "application::embed",
                op = "embed::pass",
                result = "partial",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                discovered = summary.discovered,
                rendered = summary.rendered,
                failed = summary.failed,
                "Embedded diagrams with failures"
            );
        } else {
            info!(
                target = "application::embed",
                op = "embed::pass",
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                discovered = summary.discovered,
                rendered = summary.rendered,
                "Embedded diagrams"
            );
        }

        Ok(summary)
    }

    /// Reject settings no render could succeed with; yields the archive path.
    fn validate(&self) -> Result<&Path, EmbedConfigError> {
        let RendererPaths { runtime, archive } = &self.settings.paths;
        if is_blank(runtime) {
            return Err(EmbedConfigError::MissingRuntime);
        }
        if is_blank(archive) {
            return Err(EmbedConfigError::MissingArchive);
        }
        if self.settings.language.trim().is_empty() {
            return Err(EmbedConfigError::MissingLanguage);
        }
        Ok(archive)
    }
}

fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}
