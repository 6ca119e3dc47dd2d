//! Diagram embedding: fenced PlantUML blocks in a markdown tree are rendered
//! by an external process and replaced with inline images.

pub mod service;
pub mod types;

pub use service::{
    DEFAULT_CONCURRENCY, DEFAULT_LANGUAGE, DIAGRAM_ALT_TEXT, DiagramEmbedder, EmbedSettings,
    MarkdownOutput, PlantUmlProcess, RenderedMarkdown, build_arguments, default_options,
};
pub use types::{
    DiagramRenderer, EmbedConfigError, EmbedError, EmbedSummary, RenderArguments, RenderError,
};
