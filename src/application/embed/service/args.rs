use std::{ffi::OsString, num::NonZeroU32, path::Path};

use crate::application::embed::types::RenderArguments;
use crate::domain::options::{OutputFormat, PlantUmlOptions, ReportMode};

const RUNTIME_ARCHIVE_FLAG: &str = "-jar";
const READ_STDIN_FLAG: &str = "-pipe";

/// Build the renderer argument list for one pass.
///
/// Layout: `-jar <archive>`, then one flag (or flag pair) per option that is
/// set, in field order, then `-pipe`. Pure: identical inputs always yield an
/// identical sequence.
pub fn build_arguments(archive: &Path, options: &PlantUmlOptions) -> RenderArguments {
    let mut arguments = vec![
        OsString::from(RUNTIME_ARCHIVE_FLAG),
        archive.as_os_str().to_owned(),
    ];

    for flag in RenderFlag::collect(options) {
        flag.push_onto(&mut arguments);
    }

    arguments.push(OsString::from(READ_STDIN_FLAG));
    RenderArguments::new(arguments)
}

/// One renderer flag per option field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderFlag<'o> {
    Format(OutputFormat),
    Theme(&'o str),
    DarkMode,
    Charset(&'o str),
    Report(ReportMode),
    Verbose,
    Quiet,
    Timeout(NonZeroU32),
}

impl<'o> RenderFlag<'o> {
    fn collect(options: &'o PlantUmlOptions) -> Vec<Self> {
        // Destructured so that a new option field fails to compile until it is mapped.
        let PlantUmlOptions {
            format,
            theme,
            dark_mode,
            charset,
            report_mode,
            verbose,
            quiet,
            timeout_seconds,
        } = options;

        let mut flags = Vec::new();
        if let Some(format) = format {
            flags.push(Self::Format(*format));
        }
        if let Some(theme) = theme {
            flags.push(Self::Theme(theme));
        }
        if *dark_mode == Some(true) {
            flags.push(Self::DarkMode);
        }
        if let Some(charset) = charset {
            flags.push(Self::Charset(charset));
        }
        if let Some(mode) = report_mode {
            flags.push(Self::Report(*mode));
        }
        if *verbose == Some(true) {
            flags.push(Self::Verbose);
        }
        if *quiet == Some(true) {
            flags.push(Self::Quiet);
        }
        if let Some(seconds) = timeout_seconds {
            flags.push(Self::Timeout(*seconds));
        }
        flags
    }

    fn push_onto(self, arguments: &mut Vec<OsString>) {
        match self {
            Self::Format(format) => arguments.push(format!("-t{}", format.as_str()).into()),
            Self::Theme(name) => arguments.extend([OsString::from("-theme"), name.into()]),
            Self::DarkMode => arguments.push("-darkmode".into()),
            Self::Charset(name) => arguments.extend([OsString::from("-charset"), name.into()]),
            Self::Report(ReportMode::Off) => arguments.push("-stdrpt".into()),
            Self::Report(ReportMode::Brief) => arguments.push("-stdrpt:1".into()),
            Self::Report(ReportMode::Verbose) => arguments.push("-stdrpt:2".into()),
            Self::Verbose => arguments.push("-verbose".into()),
            Self::Quiet => arguments.push("-quiet".into()),
            Self::Timeout(seconds) => {
                arguments.extend([OsString::from("-timeout"), seconds.to_string().into()])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(arguments: &RenderArguments) -> Vec<String> {
        arguments
            .iter()
            .map(|argument| argument.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn bare_options_produce_prefix_and_suffix_only() {
        let arguments =
            build_arguments(Path::new("/opt/plantuml.jar"), &PlantUmlOptions::default());
        assert_eq!(tokens(&arguments), ["-jar", "/opt/plantuml.jar", "-pipe"]);
    }

    #[test]
    fn every_option_maps_in_field_order() {
        let options = PlantUmlOptions {
            format: Some(OutputFormat::Vector),
            theme: Some("spacelab".to_string()),
            dark_mode: Some(true),
            charset: Some("UTF-8".to_string()),
            report_mode: Some(ReportMode::Verbose),
            verbose: Some(true),
            quiet: Some(true),
            timeout_seconds: NonZeroU32::new(15),
        };
        let arguments = build_arguments(Path::new("plantuml.jar"), &options);
        assert_eq!(
            tokens(&arguments),
            [
                "-jar",
                "plantuml.jar",
                "-tsvg",
                "-theme",
                "spacelab",
                "-darkmode",
                "-charset",
                "UTF-8",
                "-stdrpt:2",
                "-verbose",
                "-quiet",
                "-timeout",
                "15",
                "-pipe",
            ]
        );
    }

    #[test]
    fn vector_dark_mode_omits_unset_pairs() {
        let options = PlantUmlOptions {
            format: Some(OutputFormat::Vector),
            dark_mode: Some(true),
            ..Default::default()
        };
        let arguments = build_arguments(Path::new("plantuml.jar"), &options);
        assert!(arguments.contains("-tsvg"));
        assert!(arguments.contains("-darkmode"));
        assert!(!arguments.contains("-theme"));
        assert!(!arguments.contains("-charset"));
    }

    #[test]
    fn false_flags_are_omitted() {
        let options = PlantUmlOptions {
            dark_mode: Some(false),
            verbose: Some(false),
            quiet: Some(false),
            ..Default::default()
        };
        let arguments = build_arguments(Path::new("plantuml.jar"), &options);
        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn report_levels_encode_numerically() {
        for (mode, expected) in [
            (ReportMode::Off, "-stdrpt"),
            (ReportMode::Brief, "-stdrpt:1"),
            (ReportMode::Verbose, "-stdrpt:2"),
        ] {
            let options = PlantUmlOptions {
                report_mode: Some(mode),
                ..Default::default()
            };
            let arguments = build_arguments(Path::new("plantuml.jar"), &options);
            assert_eq!(tokens(&arguments)[2], expected, "wrong flag for {mode:?}");
        }
    }

    #[test]
    fn unvalidated_values_pass_through_verbatim() {
        let options = PlantUmlOptions {
            theme: Some("no such theme; rm -rf".to_string()),
            ..Default::default()
        };
        let arguments = build_arguments(Path::new("plantuml.jar"), &options);
        assert!(arguments.contains("no such theme; rm -rf"));
    }

    #[test]
    fn building_twice_is_identical() {
        let options = PlantUmlOptions {
            format: Some(OutputFormat::Raster),
            theme: Some("cerulean".to_string()),
            timeout_seconds: NonZeroU32::new(30),
            ..Default::default()
        };
        let first = build_arguments(Path::new("plantuml.jar"), &options);
        let second = build_arguments(Path::new("plantuml.jar"), &options);
        assert_eq!(first, second);
    }
}
