//! Invocation Builder
//!
//! Turns a [`BuildConfiguration`] into the exact `flutter assemble` command
//! line. Argument order is fixed; flutter and golden tests both depend on it.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::BuildConfiguration;
use crate::depfile::depfile_path;
use crate::rules::resolve_rules;

/// Program, working directory and arguments for one flutter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationDescriptor {
    pub program: PathBuf,
    pub working_dir: PathBuf,
    pub args: Vec<String>,
}

impl InvocationDescriptor {
    /// Build the invocation for `config`.
    pub fn from_config(config: &BuildConfiguration) -> Self {
        let mut args = Args::default();

        if let Some(ref engine) = config.local_engine {
            args.push("--local-engine").push(engine);
        }
        if let Some(ref path) = config.local_engine_src_path {
            args.push("--local-engine-src-path").push(display(path));
        }
        if let Some(ref host) = config.local_engine_host {
            args.push("--local-engine-host").push(host);
        }
        args.push(if config.verbose { "--verbose" } else { "--quiet" });

        args.push("assemble")
            .push("--no-version-check")
            .push("--depfile")
            .push(display(&depfile_path(&config.intermediate_dir)))
            .push("--output")
            .push(display(&config.intermediate_dir));

        if let Some(ref file) = config.performance_measurement_file {
            args.define("--performance-measurement-file", display(file));
        }

        args.define("-dTargetFile", display(&target_file(config)))
            .define("-dTargetPlatform", "android")
            .define("-dBuildMode", config.build_mode);

        if let Some(track) = config.track_widget_creation {
            args.define("-dTrackWidgetCreation", track);
        }
        if let Some(ref dir) = config.split_debug_info {
            args.define("-dSplitDebugInfo", display(dir));
        }
        if config.tree_shake_icons {
            args.define("-dTreeShakeIcons", true);
        }
        if config.dart_obfuscation {
            args.define("-dDartObfuscation", true);
        }
        if let Some(ref defines) = config.dart_defines {
            args.define("--DartDefines", defines);
        }
        if let Some(ref path) = config.bundle_sksl_path {
            args.define("-dBundleSkSLPath", display(path));
        }
        if let Some(ref dir) = config.code_size_directory {
            args.define("-dCodeSizeDirectory", display(dir));
        }
        if let Some(ref flavor) = config.flavor {
            args.define("-dFlavor", flavor);
        }
        if let Some(ref options) = config.extra_gen_snapshot_options {
            args.define("--ExtraGenSnapshotOptions", options);
        }
        if let Some(ref path) = config.frontend_server_starter_path {
            args.define("-dFrontendServerStarterPath", display(path));
        }
        if let Some(ref options) = config.extra_front_end_options {
            args.define("--ExtraFrontEndOptions", options);
        }

        args.define("-dAndroidArchs", config.target_platforms.join(" "))
            .define("-dMinSdkVersion", config.min_sdk_version);

        for rule in resolve_rules(
            config.build_mode,
            config.deferred_components,
            &config.target_platforms,
        ) {
            args.push(rule);
        }

        Self {
            program: config.flutter_executable.clone(),
            working_dir: config.source_dir.clone(),
            args: args.0,
        }
    }

    /// Process command ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.working_dir);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for InvocationDescriptor {
    /// Shell-like single line, quoting arguments that contain spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Entry point passed as `-dTargetFile`.
///
/// Fast start only applies to debug builds; it swaps in the splash example
/// shipped with the flutter SDK.
pub fn target_file(config: &BuildConfiguration) -> PathBuf {
    if config.uses_fast_start_target() {
        config
            .flutter_root
            .join("examples")
            .join("splash")
            .join("lib")
            .join("main.dart")
    } else {
        config.target_path.clone()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[derive(Default)]
struct Args(Vec<String>);

impl Args {
    fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    /// `name=value` as a single argument.
    fn define(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.0.push(format!("{}={}", name, value));
        self
    }
}
