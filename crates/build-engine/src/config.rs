//! Build Configuration
//!
//! Immutable description of one `flutter assemble` build step, plus the
//! builder and TOML loader that produce it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::preconditions::check_source_dir;
use crate::BuildError;

/// Target file used when the configuration does not name one.
pub const DEFAULT_TARGET_PATH: &str = "lib/main.dart";

/// Flutter build mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Debug,
    Profile,
    Release,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Profile => "profile",
            BuildMode::Release => "release",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildMode::Debug)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(BuildMode::Debug),
            "profile" => Ok(BuildMode::Profile),
            "release" => Ok(BuildMode::Release),
            other => Err(BuildError::Config(format!("unknown build mode `{}`", other))),
        }
    }
}

/// Android ABIs known to the Flutter engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AndroidArch {
    ArmeabiV7a,
    Arm64V8a,
    X86,
    X86_64,
}

impl AndroidArch {
    pub fn abi(&self) -> &'static str {
        match self {
            AndroidArch::ArmeabiV7a => "armeabi-v7a",
            AndroidArch::Arm64V8a => "arm64-v8a",
            AndroidArch::X86 => "x86",
            AndroidArch::X86_64 => "x86_64",
        }
    }

    /// Platform identifier understood by `flutter assemble`
    pub fn platform_value(&self) -> &'static str {
        match self {
            AndroidArch::ArmeabiV7a => "android-arm",
            AndroidArch::Arm64V8a => "android-arm64",
            AndroidArch::X86 => "android-x86",
            AndroidArch::X86_64 => "android-x64",
        }
    }

    pub fn all() -> &'static [AndroidArch] {
        &[
            AndroidArch::ArmeabiV7a,
            AndroidArch::Arm64V8a,
            AndroidArch::X86,
            AndroidArch::X86_64,
        ]
    }

    /// Look up an arch by ABI name or by platform identifier.
    pub fn parse(value: &str) -> Option<AndroidArch> {
        Self::all()
            .iter()
            .copied()
            .find(|arch| arch.abi() == value || arch.platform_value() == value)
    }
}

/// Configuration for a single build step.
///
/// Built once through [`BuildConfigurationBuilder`] and then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Flutter project directory; also the working directory of the invocation
    pub source_dir: PathBuf,
    /// Root for generated artifacts and the dependency file
    pub intermediate_dir: PathBuf,
    pub build_mode: BuildMode,
    /// Ordered platform identifiers
    pub target_platforms: Vec<String>,
    pub deferred_components: bool,
    pub fast_start: bool,
    pub verbose: bool,
    pub min_sdk_version: u32,
    pub flutter_root: PathBuf,
    pub flutter_executable: PathBuf,
    pub target_path: PathBuf,

    pub local_engine: Option<String>,
    pub local_engine_src_path: Option<PathBuf>,
    pub local_engine_host: Option<String>,
    pub performance_measurement_file: Option<PathBuf>,
    pub track_widget_creation: Option<bool>,
    pub split_debug_info: Option<PathBuf>,
    pub tree_shake_icons: bool,
    pub dart_obfuscation: bool,
    pub dart_defines: Option<String>,
    pub bundle_sksl_path: Option<PathBuf>,
    pub code_size_directory: Option<PathBuf>,
    pub flavor: Option<String>,
    pub extra_gen_snapshot_options: Option<String>,
    pub frontend_server_starter_path: Option<PathBuf>,
    pub extra_front_end_options: Option<String>,
}

impl BuildConfiguration {
    pub fn builder() -> BuildConfigurationBuilder {
        BuildConfigurationBuilder::default()
    }

    /// Parse a build step file.
    pub fn from_toml_str(contents: &str) -> Result<Self, BuildError> {
        let builder: BuildConfigurationBuilder = toml::from_str(contents)?;
        builder.build()
    }

    /// Load a build step file from disk.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub async fn load(path: &Path) -> Result<Self, BuildError> {
        BuildConfigurationBuilder::load(path).await?.build()
    }

    /// Fail unless `source_dir` is an existing directory.
    pub fn check_preconditions(&self) -> Result<(), BuildError> {
        check_source_dir(Some(&self.source_dir))
    }

    /// Copy with directory fields made absolute against `base`.
    ///
    /// flutter runs inside `source_dir`, so relative output paths would
    /// otherwise be resolved a second time from there.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let mut config = self.clone();
        config.source_dir = base.join(&self.source_dir);
        config.intermediate_dir = base.join(&self.intermediate_dir);
        config.flutter_root = base.join(&self.flutter_root);
        config.flutter_executable = resolve_program(base, &self.flutter_executable);
        config
    }

    /// Whether the fast-start placeholder replaces the configured target.
    pub fn uses_fast_start_target(&self) -> bool {
        self.fast_start && self.build_mode.is_debug()
    }
}

/// Builder for [`BuildConfiguration`]. Also the on-disk shape of a build file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfigurationBuilder {
    source_dir: Option<PathBuf>,
    intermediate_dir: Option<PathBuf>,
    build_mode: Option<BuildMode>,
    target_platforms: Vec<String>,
    deferred_components: bool,
    fast_start: bool,
    verbose: bool,
    min_sdk_version: Option<u32>,
    flutter_root: Option<PathBuf>,
    flutter_executable: Option<PathBuf>,
    target_path: Option<PathBuf>,

    local_engine: Option<String>,
    local_engine_src_path: Option<PathBuf>,
    local_engine_host: Option<String>,
    performance_measurement_file: Option<PathBuf>,
    track_widget_creation: Option<bool>,
    split_debug_info: Option<PathBuf>,
    tree_shake_icons: bool,
    dart_obfuscation: bool,
    dart_defines: Option<String>,
    bundle_sksl_path: Option<PathBuf>,
    code_size_directory: Option<PathBuf>,
    flavor: Option<String>,
    extra_gen_snapshot_options: Option<String>,
    frontend_server_starter_path: Option<PathBuf>,
    extra_front_end_options: Option<String>,
}

impl BuildConfigurationBuilder {
    /// Read a build file without finishing it, so callers can layer
    /// defaults and overrides on top.
    ///
    /// Relative paths in the file are resolved against the file's directory,
    /// which is itself made absolute.
    pub async fn load(path: &Path) -> Result<Self, BuildError> {
        let cwd = std::env::current_dir()?;
        Self::load_in(&cwd, path).await
    }

    async fn load_in(cwd: &Path, path: &Path) -> Result<Self, BuildError> {
        let path = cwd.join(path);
        debug!("Loading build configuration from {:?}", path);
        let contents = tokio::fs::read_to_string(&path).await?;
        let builder: BuildConfigurationBuilder = toml::from_str(&contents)?;
        let base = path.parent().unwrap_or(cwd);
        Ok(builder.relative_to(base))
    }

    pub fn source_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(path.into());
        self
    }

    pub fn intermediate_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.intermediate_dir = Some(path.into());
        self
    }

    pub fn build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = Some(mode);
        self
    }

    pub fn target_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn deferred_components(mut self, enabled: bool) -> Self {
        self.deferred_components = enabled;
        self
    }

    pub fn fast_start(mut self, enabled: bool) -> Self {
        self.fast_start = enabled;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn min_sdk_version(mut self, version: u32) -> Self {
        self.min_sdk_version = Some(version);
        self
    }

    pub fn flutter_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.flutter_root = Some(path.into());
        self
    }

    pub fn flutter_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.flutter_executable = Some(path.into());
        self
    }

    pub fn target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn local_engine(mut self, engine: impl Into<String>) -> Self {
        self.local_engine = Some(engine.into());
        self
    }

    pub fn local_engine_src_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_engine_src_path = Some(path.into());
        self
    }

    pub fn local_engine_host(mut self, host: impl Into<String>) -> Self {
        self.local_engine_host = Some(host.into());
        self
    }

    pub fn performance_measurement_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.performance_measurement_file = Some(path.into());
        self
    }

    pub fn track_widget_creation(mut self, enabled: bool) -> Self {
        self.track_widget_creation = Some(enabled);
        self
    }

    pub fn split_debug_info(mut self, path: impl Into<PathBuf>) -> Self {
        self.split_debug_info = Some(path.into());
        self
    }

    pub fn tree_shake_icons(mut self, enabled: bool) -> Self {
        self.tree_shake_icons = enabled;
        self
    }

    pub fn dart_obfuscation(mut self, enabled: bool) -> Self {
        self.dart_obfuscation = enabled;
        self
    }

    pub fn dart_defines(mut self, defines: impl Into<String>) -> Self {
        self.dart_defines = Some(defines.into());
        self
    }

    pub fn bundle_sksl_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_sksl_path = Some(path.into());
        self
    }

    pub fn code_size_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.code_size_directory = Some(path.into());
        self
    }

    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }

    pub fn extra_gen_snapshot_options(mut self, options: impl Into<String>) -> Self {
        self.extra_gen_snapshot_options = Some(options.into());
        self
    }

    pub fn frontend_server_starter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.frontend_server_starter_path = Some(path.into());
        self
    }

    pub fn extra_front_end_options(mut self, options: impl Into<String>) -> Self {
        self.extra_front_end_options = Some(options.into());
        self
    }

    /// Fill `flutter-root` when the build file leaves it out.
    pub fn default_flutter_root(mut self, path: impl Into<PathBuf>) -> Self {
        if self.flutter_root.is_none() {
            self.flutter_root = Some(path.into());
        }
        self
    }

    /// Fill `min-sdk-version` when the build file leaves it out.
    pub fn default_min_sdk_version(mut self, version: u32) -> Self {
        self.min_sdk_version.get_or_insert(version);
        self
    }

    /// Resolve relative directory fields against `base`.
    ///
    /// `target-path` is left alone: flutter resolves it against the source dir.
    pub fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.source_dir);
        rebase(&mut self.intermediate_dir);
        rebase(&mut self.flutter_root);
        if let Some(program) = self.flutter_executable.as_mut() {
            *program = resolve_program(base, program);
        }
        self
    }

    /// Finish the configuration.
    ///
    /// Does not touch the filesystem; existence of `source_dir` is checked by
    /// [`BuildConfiguration::check_preconditions`].
    pub fn build(self) -> Result<BuildConfiguration, BuildError> {
        let source_dir = self
            .source_dir
            .ok_or(BuildError::InvalidSourceDirectory { path: None })?;
        let intermediate_dir = self
            .intermediate_dir
            .ok_or_else(|| BuildError::Config("intermediate-dir is required".into()))?;
        let build_mode = self
            .build_mode
            .ok_or_else(|| BuildError::Config("build-mode is required".into()))?;
        let min_sdk_version = self
            .min_sdk_version
            .ok_or_else(|| BuildError::Config("min-sdk-version is required".into()))?;
        let flutter_root = self
            .flutter_root
            .ok_or_else(|| BuildError::Config("flutter-root is required".into()))?;

        if self.target_platforms.is_empty() && !(build_mode.is_debug() && self.fast_start) {
            return Err(BuildError::Config(format!(
                "target-platforms must not be empty for a {} build",
                build_mode
            )));
        }

        let flutter_executable = self
            .flutter_executable
            .unwrap_or_else(|| default_flutter_executable(&flutter_root));

        Ok(BuildConfiguration {
            source_dir,
            intermediate_dir,
            build_mode,
            target_platforms: self.target_platforms,
            deferred_components: self.deferred_components,
            fast_start: self.fast_start,
            verbose: self.verbose,
            min_sdk_version,
            flutter_root,
            flutter_executable,
            target_path: self
                .target_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_PATH)),
            local_engine: self.local_engine,
            local_engine_src_path: self.local_engine_src_path,
            local_engine_host: self.local_engine_host,
            performance_measurement_file: self.performance_measurement_file,
            track_widget_creation: self.track_widget_creation,
            split_debug_info: self.split_debug_info,
            tree_shake_icons: self.tree_shake_icons,
            dart_obfuscation: self.dart_obfuscation,
            dart_defines: self.dart_defines,
            bundle_sksl_path: self.bundle_sksl_path,
            code_size_directory: self.code_size_directory,
            flavor: self.flavor,
            extra_gen_snapshot_options: self.extra_gen_snapshot_options,
            frontend_server_starter_path: self.frontend_server_starter_path,
            extra_front_end_options: self.extra_front_end_options,
        })
    }
}

/// Bare program names stay as they are so they are looked up on `PATH`.
fn resolve_program(base: &Path, program: &Path) -> PathBuf {
    if program.components().count() > 1 {
        base.join(program)
    } else {
        program.to_path_buf()
    }
}

/// `{flutter_root}/bin/flutter`, with the batch wrapper on Windows.
pub fn default_flutter_executable(flutter_root: &Path) -> PathBuf {
    let name = if cfg!(windows) { "flutter.bat" } else { "flutter" };
    flutter_root.join("bin").join(name)
}
