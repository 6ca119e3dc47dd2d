use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    process::Stdio,
    time::Instant,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    process::{ChildStderr, Command},
};
use tracing::{debug, info, warn};

use crate::application::embed::types::{DiagramRenderer, RenderArguments, RenderError};

/// Renders diagrams by running the renderer runtime once per diagram.
///
/// The diagram source goes in on stdin, image bytes come back on stdout and
/// stderr lines are relayed to the log. There is no local timeout and no retry.
#[derive(Debug, Clone)]
pub struct PlantUmlProcess {
    runtime: PathBuf,
}

impl PlantUmlProcess {
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }
}

#[async_trait]
impl DiagramRenderer for PlantUmlProcess {
    async fn render(
        &self,
        source: &str,
        arguments: &RenderArguments,
    ) -> Result<Vec<u8>, RenderError> {
        let started_at = Instant::now();

        let mut child = Command::new(&self.runtime)
            .args(arguments.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                warn!(
                    target = "application::embed::plantuml",
                    op = "plantuml::render",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_renderer",
                    runtime = %self.runtime.display(),
                    error = %err,
                    "Failed to spawn PlantUML renderer"
                );
                spawn_error(&self.runtime, err)
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Dropping stdin at the end of this block closes the pipe, which is the
        // renderer's end-of-input signal.
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(source.as_bytes()).await?;
                stdin.flush().await?;
            }
            Ok::<(), io::Error>(())
        };

        let collect = async move {
            let mut buffer = Vec::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_end(&mut buffer).await?;
            }
            Ok::<Vec<u8>, io::Error>(buffer)
        };

        let (fed, collected, ()) = tokio::join!(feed, collect, relay_diagnostics(stderr));

        let status = child.wait().await.map_err(RenderError::Io)?;
        if !status.success() {
            warn!(
                target = "application::embed::plantuml",
                op = "plantuml::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = status.code().map(i64::from).unwrap_or(-1),
                error_code = "renderer_exit",
                "PlantUML renderer exited unsuccessfully"
            );
            return Err(RenderError::Exit { status });
        }

        if let Err(err) = fed {
            debug!(
                target = "application::embed::plantuml",
                op = "plantuml::render",
                error = %err,
                "PlantUML renderer closed its input early"
            );
        }

        let output = collected.map_err(RenderError::Io)?;
        if output.is_empty() {
            warn!(
                target = "application::embed::plantuml",
                op = "plantuml::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_code = "empty_output",
                "PlantUML renderer succeeded without writing an image"
            );
            return Err(RenderError::EmptyOutput);
        }

        info!(
            target = "application::embed::plantuml",
            op = "plantuml::render",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            source_bytes = source.len(),
            output_bytes = output.len(),
            "PlantUML diagram rendered"
        );

        Ok(output)
    }
}

fn spawn_error(runtime: &Path, err: io::Error) -> RenderError {
    let program = runtime.to_path_buf();
    if err.kind() == ErrorKind::NotFound {
        RenderError::NotFound {
            program,
            source: err,
        }
    } else {
        RenderError::Spawn {
            program,
            source: err,
        }
    }
}

/// Forward every non-blank stderr line to the log until the stream closes.
///
/// Lines are read as raw bytes so that a non-UTF-8 diagnostic cannot stop the
/// drain and leave the renderer blocked on a full pipe.
async fn relay_diagnostics(stderr: Option<ChildStderr>) {
    let Some(stderr) = stderr else {
        return;
    };

    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    warn!(
                        target = "application::embed::plantuml",
                        op = "plantuml::diagnostics",
                        line = trimmed,
                        "PlantUML renderer diagnostic"
                    );
                }
            }
            Err(err) => {
                warn!(
                    target = "application::embed::plantuml",
                    op = "plantuml::diagnostics",
                    error = %err,
                    "Failed to read PlantUML renderer diagnostics"
                );
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::application::embed::service::args::build_arguments;
    use crate::domain::options::PlantUmlOptions;
    use serial_test::serial;
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(mode);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }

    fn arguments() -> RenderArguments {
        build_arguments(Path::new("plantuml.jar"), &PlantUmlOptions::default())
    }

    #[tokio::test]
    #[serial]
    async fn echoes_stdout_bytes_on_success() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(&dir, "fake-java", "#!/bin/sh\ncat\n", 0o755);

        let output = PlantUmlProcess::new(runtime)
            .render("@startuml\nA -> B\n@enduml\n", &arguments())
            .await
            .expect("render succeeds");

        assert_eq!(output, b"@startuml\nA -> B\n@enduml\n");
    }

    #[tokio::test]
    #[serial]
    async fn passes_the_argument_sequence() {
        let dir = TempDir::new().expect("temp dir");
        let args_path = dir.path().join("args.log");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > \"{}\"\ncat\n",
            args_path.display()
        );
        let runtime = write_script(&dir, "fake-java", &script, 0o755);

        PlantUmlProcess::new(runtime)
            .render("x", &arguments())
            .await
            .expect("render succeeds");

        let logged = fs::read_to_string(&args_path).expect("read args");
        assert_eq!(logged.trim(), "-jar plantuml.jar -pipe");
    }

    #[tokio::test]
    #[serial]
    async fn binary_output_is_not_line_framed() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(
            &dir,
            "fake-java",
            "#!/bin/sh\ncat > /dev/null\nprintf '\\211PNG\\r\\n\\032\\n\\000\\001'\n",
            0o755,
        );

        let output = PlantUmlProcess::new(runtime)
            .render("ignored", &arguments())
            .await
            .expect("render succeeds");

        assert_eq!(output, b"\x89PNG\r\n\x1a\n\x00\x01");
    }

    #[tokio::test]
    #[serial]
    async fn nonzero_exit_discards_partial_output() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(
            &dir,
            "fake-java",
            "#!/bin/sh\ncat > /dev/null\nprintf 'partial'\necho 'syntax error' >&2\nexit 3\n",
            0o755,
        );

        let err = PlantUmlProcess::new(runtime)
            .render("bad", &arguments())
            .await
            .expect_err("render fails");

        match err {
            RenderError::Exit { status } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn missing_runtime_reports_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = dir.path().join("no-such-java");

        let err = PlantUmlProcess::new(runtime.clone())
            .render("x", &arguments())
            .await
            .expect_err("spawn fails");

        match err {
            RenderError::NotFound { program, .. } => assert_eq!(program, runtime),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn non_executable_runtime_reports_spawn_failure() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(&dir, "fake-java", "#!/bin/sh\ncat\n", 0o644);

        let err = PlantUmlProcess::new(runtime)
            .render("x", &arguments())
            .await
            .expect_err("spawn fails");

        assert!(
            matches!(err, RenderError::Spawn { .. }),
            "unexpected error: {err:?}"
        );
        assert!(err.to_string().starts_with("failed to spawn renderer"));
    }

    #[tokio::test]
    #[serial]
    async fn empty_output_on_success_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(&dir, "fake-java", "#!/bin/sh\nexit 0\n", 0o755);

        let err = PlantUmlProcess::new(runtime)
            .render("@startuml\n@enduml\n", &arguments())
            .await
            .expect_err("empty output rejected");

        assert!(matches!(err, RenderError::EmptyOutput));
    }

    #[tokio::test]
    #[serial]
    async fn stderr_noise_does_not_fail_a_successful_render() {
        let dir = TempDir::new().expect("temp dir");
        let runtime = write_script(
            &dir,
            "fake-java",
            "#!/bin/sh\necho 'warning: deprecated skinparam' >&2\ncat\n",
            0o755,
        );

        let output = PlantUmlProcess::new(runtime)
            .render("payload", &arguments())
            .await
            .expect("render succeeds");

        assert_eq!(output, b"payload");
    }
}
