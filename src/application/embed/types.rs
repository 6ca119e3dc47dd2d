use std::{ffi::OsString, io, path::PathBuf, process::ExitStatus, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// Ordered renderer arguments, built once per embedding pass and shared
/// read-only by every render in that pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArguments(Arc<[OsString]>);

impl RenderArguments {
    pub(crate) fn new(arguments: Vec<OsString>) -> Self {
        Self(arguments.into())
    }

    pub fn as_slice(&self) -> &[OsString] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &OsString> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any single argument equals `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|argument| argument == token)
    }
}

/// Failure of one render. Always localized to the diagram that caused it.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer executable `{}` not found: {source}", .program.display())]
    NotFound {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn renderer `{}`: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("renderer exited unsuccessfully ({status})")]
    Exit { status: ExitStatus },
    #[error("renderer pipe failed: {0}")]
    Io(#[source] io::Error),
    #[error("renderer produced no output")]
    EmptyOutput,
}

/// Failure that prevents a whole embedding pass from starting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedConfigError {
    #[error("renderer runtime path is not configured")]
    MissingRuntime,
    #[error("renderer archive path is not configured")]
    MissingArchive,
    #[error("diagram language tag is empty")]
    MissingLanguage,
}

/// Errors surfaced by the markdown entry points, which also own parsing and
/// serialisation.
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    #[error(transparent)]
    Config(#[from] EmbedConfigError),
    #[error("markdown serialisation failed: {message}")]
    Markdown { message: String },
}

/// Counts reported once a pass has resolved every diagram it discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedSummary {
    pub discovered: usize,
    pub rendered: usize,
    pub failed: usize,
}

impl EmbedSummary {
    pub(crate) fn discovered(count: usize) -> Self {
        Self {
            discovered: count,
            ..Self::default()
        }
    }

    pub(crate) fn record(mut self, substitution: Substitution) -> Self {
        match substitution {
            Substitution::Image => self.rendered += 1,
            Substitution::Error => self.failed += 1,
        }
        self
    }
}

/// What a resolved diagram was replaced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Substitution {
    Image,
    Error,
}

/// Seam between the tree transform and whatever produces image bytes.
///
/// Implementations must not share mutable state between calls: one call is
/// one render, and calls for the same pass run interleaved on one task.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(
        &self,
        source: &str,
        arguments: &RenderArguments,
    ) -> Result<Vec<u8>, RenderError>;
}
