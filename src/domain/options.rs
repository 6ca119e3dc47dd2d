//! Renderer options: the typed configuration shared by every render in one pass.

use std::{fmt, num::NonZeroU32, path::PathBuf, str::FromStr};

use thiserror::Error;

pub const DEFAULT_RUNTIME_PATH: &str = "java";
pub const DEFAULT_ARCHIVE_PATH: &str = "plantuml.jar";

/// Kind of image the renderer writes to its output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// PNG bitmap.
    #[default]
    Raster,
    /// SVG document.
    Vector,
}

impl OutputFormat {
    /// Renderer-facing name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raster => "png",
            Self::Vector => "svg",
        }
    }

    /// Media type used when the output is embedded as a data URI.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Raster => "image/png",
            Self::Vector => "image/svg+xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" | "raster" => Ok(Self::Raster),
            "svg" | "vector" => Ok(Self::Vector),
            _ => Err(ParseOptionError::new("output format", value)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level of the renderer's standard error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Off,
    Brief,
    Verbose,
}

impl ReportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Brief => "brief",
            Self::Verbose => "verbose",
        }
    }
}

impl FromStr for ReportMode {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "off" => Ok(Self::Off),
            "1" | "brief" => Ok(Self::Brief),
            "2" | "verbose" => Ok(Self::Verbose),
            _ => Err(ParseOptionError::new("report mode", value)),
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl ParseOptionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Options forwarded to the renderer.
///
/// Every field is optional; unset fields produce no renderer argument at all.
/// Values are not validated here: a theme or charset the renderer does not
/// know is passed through verbatim and rejected (or ignored) by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlantUmlOptions {
    pub format: Option<OutputFormat>,
    pub theme: Option<String>,
    pub dark_mode: Option<bool>,
    pub charset: Option<String>,
    pub report_mode: Option<ReportMode>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
    /// Enforced by the renderer itself, never locally.
    pub timeout_seconds: Option<NonZeroU32>,
}

impl PlantUmlOptions {
    /// Merge the engine defaults underneath the explicit options.
    ///
    /// Only `format` has a default; an explicit value always wins.
    pub fn with_defaults(mut self) -> Self {
        self.format.get_or_insert(OutputFormat::default());
        self
    }

    /// Format the embedded image is tagged with.
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Locations of the renderer runtime and the renderer archive it executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererPaths {
    pub runtime: PathBuf,
    pub archive: PathBuf,
}

impl Default for RendererPaths {
    fn default() -> Self {
        Self {
            runtime: PathBuf::from(DEFAULT_RUNTIME_PATH),
            archive: PathBuf::from(DEFAULT_ARCHIVE_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_accepts_renderer_and_descriptive_names() {
        assert_eq!("png".parse(), Ok(OutputFormat::Raster));
        assert_eq!("Raster".parse(), Ok(OutputFormat::Raster));
        assert_eq!("SVG".parse(), Ok(OutputFormat::Vector));
        assert_eq!("vector".parse(), Ok(OutputFormat::Vector));
        assert!("jpeg".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn media_types_follow_format() {
        assert_eq!(OutputFormat::Raster.media_type(), "image/png");
        assert_eq!(OutputFormat::Vector.media_type(), "image/svg+xml");
    }

    #[test]
    fn report_mode_accepts_numeric_levels() {
        assert_eq!("".parse(), Ok(ReportMode::Off));
        assert_eq!("1".parse(), Ok(ReportMode::Brief));
        assert_eq!("verbose".parse(), Ok(ReportMode::Verbose));
        let err = "3".parse::<ReportMode>().expect_err("unknown level");
        assert_eq!(err.to_string(), "unknown report mode `3`");
    }

    #[test]
    fn defaults_only_fill_the_format() {
        let merged = PlantUmlOptions::default().with_defaults();
        assert_eq!(
            merged,
            PlantUmlOptions {
                format: Some(OutputFormat::Raster),
                ..Default::default()
            }
        );
    }

    #[test]
    fn explicit_format_overrides_default() {
        let merged = PlantUmlOptions {
            format: Some(OutputFormat::Vector),
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(merged.output_format(), OutputFormat::Vector);
    }
}
