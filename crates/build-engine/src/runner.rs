//! Build Runner
//!
//! Runs one build step: precondition check, invocation, process launch.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    dependency_files, resolve_rules, BuildConfiguration, BuildError, DependencyFiles,
    InvocationDescriptor,
};

/// Result of a successful build step
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Depfile(s) written by flutter
    pub dependency_files: DependencyFiles,
    /// Rules that were requested
    pub rules: Vec<String>,
    /// Wall time in seconds
    pub duration_secs: f64,
}

/// Build progress
#[derive(Debug, Clone)]
pub enum BuildProgress {
    Validated,
    Started { command: String },
    Output(String),
    Warning(String),
    Completed { output: BuildOutput },
    Failed { error: String },
}

/// Runs `flutter assemble` for one configuration
pub struct BuildRunner {
    config: BuildConfiguration,
}

impl BuildRunner {
    pub fn new(config: BuildConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    /// Check preconditions and return the invocation without running it.
    pub fn prepare(&self) -> Result<InvocationDescriptor, BuildError> {
        let config = self.resolved()?;
        config.check_preconditions()?;
        Ok(InvocationDescriptor::from_config(&config))
    }

    /// Run the build
    pub async fn run(&self) -> Result<BuildOutput, BuildError> {
        self.execute(None).await
    }

    /// Run the build, reporting progress on `tx`.
    ///
    /// The channel is unbounded so a receiver that only drains after the run
    /// cannot stall the child on a full pipe.
    pub async fn run_with_progress(
        &self,
        tx: mpsc::UnboundedSender<BuildProgress>,
    ) -> Result<BuildOutput, BuildError> {
        let result = self.execute(Some(&tx)).await;
        let event = match &result {
            Ok(output) => BuildProgress::Completed { output: output.clone() },
            Err(err) => BuildProgress::Failed { error: err.to_string() },
        };
        let _ = tx.send(event);
        result
    }

    fn resolved(&self) -> Result<BuildConfiguration, BuildError> {
        let cwd = std::env::current_dir()?;
        Ok(self.config.resolved_against(&cwd))
    }

    async fn execute(
        &self,
        tx: Option<&mpsc::UnboundedSender<BuildProgress>>,
    ) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        let config = self.resolved()?;
        config.check_preconditions()?;
        let invocation = InvocationDescriptor::from_config(&config);
        notify(tx, BuildProgress::Validated);

        tokio::fs::create_dir_all(&config.intermediate_dir).await?;

        info!(
            "Running flutter assemble ({}) in {:?}",
            config.build_mode, invocation.working_dir
        );
        debug!("Command: {}", invocation);
        notify(tx, BuildProgress::Started { command: invocation.to_string() });

        let mut child = invocation
            .to_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BuildError::InvocationFailed(format!(
                    "could not start {}: {}",
                    invocation.program.display(),
                    e
                ))
            })?;

        let mut readers = Vec::new();

        if let Some(stdout) = child.stdout.take() {
            let tx = tx.cloned();
            readers.push(tokio::spawn(forward_lines(stdout, move |line| {
                info!("{}", line);
                notify(tx.as_ref(), BuildProgress::Output(line));
            })));
        }

        if let Some(stderr) = child.stderr.take() {
            let tx = tx.cloned();
            readers.push(tokio::spawn(forward_lines(stderr, move |line| {
                if !line.is_empty() {
                    warn!("{}", line);
                    notify(tx.as_ref(), BuildProgress::Warning(line));
                }
            })));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BuildError::InvocationFailed(e.to_string()))?;

        for reader in readers {
            let _ = reader.await;
        }

        if !status.success() {
            return Err(BuildError::InvocationFailed(format!(
                "{} exited with {}",
                invocation.program.display(),
                status
            )));
        }

        let duration = start.elapsed().as_secs_f64();
        info!("flutter assemble completed in {:.2}s", duration);

        Ok(BuildOutput {
            dependency_files: dependency_files(&config.intermediate_dir),
            rules: resolve_rules(
                config.build_mode,
                config.deferred_components,
                &config.target_platforms,
            ),
            duration_secs: duration,
        })
    }
}

/// Read `reader` to EOF line by line.
///
/// Lines are decoded lossily; stopping on bad UTF-8 would close the pipe
/// and kill flutter with SIGPIPE on its next write.
async fn forward_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => {
                warn!("Lost flutter output: {}", e);
                break;
            }
        }
    }
}

fn notify(tx: Option<&mpsc::UnboundedSender<BuildProgress>>, event: BuildProgress) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildMode;
    use std::path::Path;

    fn config_for(source: &Path, flutter: &Path) -> BuildConfiguration {
        BuildConfiguration::builder()
            .source_dir(source)
            .intermediate_dir(source.join("build").join("intermediates"))
            .build_mode(BuildMode::Release)
            .target_platforms(["android-arm64"])
            .min_sdk_version(21)
            .flutter_root(source.join("sdk"))
            .flutter_executable(flutter)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_source_dir_stops_before_launch() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("app");
        let runner = BuildRunner::new(config_for(&missing, Path::new("/nonexistent/flutter")));

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, BuildError::InvalidSourceDirectory { .. }));
        assert!(!missing.join("build").exists());
    }

    #[test]
    fn test_prepare_returns_invocation() {
        let tmp = tempfile::tempdir().unwrap();
        let flutter = Path::new("/opt/flutter/bin/flutter");
        let runner = BuildRunner::new(config_for(tmp.path(), flutter));

        let invocation = runner.prepare().unwrap();
        assert_eq!(invocation.working_dir, tmp.path());
        assert_eq!(
            invocation.args.last().map(String::as_str),
            Some("android_aot_bundle_release_android-arm64")
        );
    }

    #[test]
    fn test_prepare_makes_relative_paths_absolute() {
        // Tests run from the package root, where `src` exists.
        let cwd = std::env::current_dir().unwrap();
        let config = BuildConfiguration::builder()
            .source_dir("src")
            .intermediate_dir("build/intermediates")
            .build_mode(BuildMode::Debug)
            .target_platforms(["android-arm"])
            .min_sdk_version(21)
            .flutter_root("sdk")
            .build()
            .unwrap();
        let runner = BuildRunner::new(config);

        let invocation = runner.prepare().unwrap();
        assert_eq!(invocation.working_dir, cwd.join("src"));
        assert_eq!(invocation.program, cwd.join("sdk").join("bin").join("flutter"));
        let depfile = invocation
            .args
            .iter()
            .position(|a| a == "--depfile")
            .map(|i| invocation.args[i + 1].clone())
            .unwrap();
        assert_eq!(
            Path::new(&depfile),
            cwd.join("build").join("intermediates").join("flutter_build.d")
        );
        // The stored configuration is left untouched.
        assert_eq!(runner.config().source_dir, Path::new("src"));
    }

    // Process launches share one test so no other test forks while the fake
    // flutter script is still open for writing.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_outcomes() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("app");
        std::fs::create_dir_all(&source).unwrap();

        let argv_file = tmp.path().join("argv.txt");
        let script = tmp.path().join("flutter");
        // Non-UTF-8 output followed by more than a pipe buffer of lines must
        // not end the read loop early.
        let body = format!(
            r#"#!/bin/sh
pwd > '{out}'
for a in "$@"; do echo "$a" >> '{out}'; done
echo compiled
echo careful >&2
printf 'caf\351\n'
i=0
while [ $i -lt 2000 ]; do echo "line $i"; i=$((i + 1)); done
exit 0
"#,
            out = argv_file.display()
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = BuildRunner::new(config_for(&source, &script));
        let expected = runner.prepare().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = runner.run_with_progress(tx).await.unwrap();

        assert!(source.join("build").join("intermediates").is_dir());
        assert_eq!(output.rules, vec!["android_aot_bundle_release_android-arm64"]);
        assert!(output
            .dependency_files
            .contains(&source.join("build").join("intermediates").join("flutter_build.d")));

        let recorded = std::fs::read_to_string(&argv_file).unwrap();
        let mut lines = recorded.lines();
        let cwd = lines.next().unwrap();
        assert_eq!(Path::new(cwd), std::fs::canonicalize(&source).unwrap());
        assert_eq!(lines.map(str::to_string).collect::<Vec<_>>(), expected.args);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(BuildProgress::Validated)));
        assert!(matches!(events.last(), Some(BuildProgress::Completed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, BuildProgress::Output(line) if line == "compiled")));
        assert!(events
            .iter()
            .any(|e| matches!(e, BuildProgress::Warning(line) if line == "careful")));
        assert!(events
            .iter()
            .any(|e| matches!(e, BuildProgress::Output(line) if line == "caf\u{FFFD}")));
        assert!(events
            .iter()
            .any(|e| matches!(e, BuildProgress::Output(line) if line == "line 1999")));

        let failing = BuildRunner::new(config_for(&source, Path::new("/bin/false")));
        assert!(matches!(
            failing.run().await,
            Err(BuildError::InvocationFailed(_))
        ));

        let missing = BuildRunner::new(config_for(&source, &tmp.path().join("no-flutter")));
        assert!(matches!(
            missing.run().await,
            Err(BuildError::InvocationFailed(_))
        ));
    }
}
