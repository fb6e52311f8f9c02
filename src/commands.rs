//! CLI commands for flutter-assemble
//!
//! Each command loads what it needs, does one thing and returns its result
//! to `main` for printing.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;

use flutter_assemble_build_engine::{
    dependency_files, resolve_rules, AndroidArch, BuildConfiguration, BuildConfigurationBuilder,
    BuildMode, BuildOutput, BuildRunner,
};
use flutter_assemble_core::ToolConfig;

/// Command-line overrides layered on top of a build file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub build_mode: Option<BuildMode>,
    pub verbose: bool,
    pub target_platforms: Vec<String>,
    pub abis: Vec<String>,
}

impl Overrides {
    fn apply(&self, mut builder: BuildConfigurationBuilder) -> Result<BuildConfigurationBuilder> {
        if let Some(mode) = self.build_mode {
            builder = builder.build_mode(mode);
        }
        if self.verbose {
            builder = builder.verbose(true);
        }
        let platforms = platforms_from(&self.target_platforms, &self.abis)?;
        if !platforms.is_empty() {
            builder = builder.target_platforms(platforms);
        }
        Ok(builder)
    }
}

/// Merge `--platform` values with `--abi` values translated to platform ids.
pub fn platforms_from(platforms: &[String], abis: &[String]) -> Result<Vec<String>> {
    let mut merged = platforms.to_vec();
    for abi in abis {
        let arch = AndroidArch::parse(abi).with_context(|| {
            format!(
                "unknown ABI `{}` (expected one of {})",
                abi,
                AndroidArch::all()
                    .iter()
                    .map(|a| a.abi())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        merged.push(arch.platform_value().to_string());
    }
    Ok(merged)
}

/// Load tool settings from `path`, or from the platform config directory.
pub async fn load_settings(path: Option<&Path>) -> Result<ToolConfig> {
    let settings = match path {
        Some(path) => ToolConfig::load_from(path).await,
        None => ToolConfig::load().await,
    };
    settings.map_err(|e| anyhow!(e.user_message()))
}

/// Load a build file and fill gaps from tool settings and overrides.
pub async fn load_configuration(
    path: &Path,
    settings: &ToolConfig,
    overrides: &Overrides,
) -> Result<BuildConfiguration> {
    let mut builder = BuildConfigurationBuilder::load(path)
        .await
        .with_context(|| format!("read build file {}", path.display()))?;

    if let Some(root) = settings.flutter_root() {
        builder = builder.default_flutter_root(root);
    }
    if let Some(version) = settings.flutter.min_sdk_version {
        builder = builder.default_min_sdk_version(version);
    }

    let config = overrides
        .apply(builder)?
        .build()
        .with_context(|| format!("invalid build file {}", path.display()))?;
    Ok(config)
}

/// Validate and run `flutter assemble`
pub struct AssembleCommand {
    pub config_path: PathBuf,
    pub overrides: Overrides,
}

impl AssembleCommand {
    pub async fn execute(&self, settings: &ToolConfig) -> Result<BuildOutput> {
        let config = load_configuration(&self.config_path, settings, &self.overrides).await?;
        info!("Assembling {:?} ({})", config.source_dir, config.build_mode);

        let output = BuildRunner::new(config).run().await?;
        Ok(output)
    }
}

/// Validate and print the invocation without running it
pub struct PrintCommand {
    pub config_path: PathBuf,
    pub overrides: Overrides,
}

impl PrintCommand {
    pub async fn execute(&self, settings: &ToolConfig) -> Result<String> {
        let config = load_configuration(&self.config_path, settings, &self.overrides).await?;
        let invocation = BuildRunner::new(config).prepare()?;
        Ok(invocation.to_string())
    }
}

/// Only run the precondition check
pub struct CheckCommand {
    pub config_path: PathBuf,
}

impl CheckCommand {
    pub async fn execute(&self, settings: &ToolConfig) -> Result<PathBuf> {
        let config = load_configuration(&self.config_path, settings, &Overrides::default()).await?;
        config.check_preconditions()?;
        Ok(config.source_dir)
    }
}

/// Resolve rule names without a build file
pub struct RulesCommand {
    pub build_mode: BuildMode,
    pub deferred_components: bool,
    pub target_platforms: Vec<String>,
    pub abis: Vec<String>,
}

impl RulesCommand {
    pub fn execute(&self) -> Result<Vec<String>> {
        let platforms = platforms_from(&self.target_platforms, &self.abis)?;
        Ok(resolve_rules(self.build_mode, self.deferred_components, &platforms))
    }
}

/// Print the depfile declared for an intermediate directory
pub struct DepfileCommand {
    pub intermediate_dir: PathBuf,
}

impl DepfileCommand {
    pub fn execute(&self) -> Vec<PathBuf> {
        dependency_files(&self.intermediate_dir).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abis_translate_to_platforms() {
        let platforms = platforms_from(
            &["custom".to_string()],
            &["arm64-v8a".to_string(), "x86_64".to_string()],
        )
        .unwrap();
        assert_eq!(platforms, vec!["custom", "android-arm64", "android-x64"]);
        assert!(platforms_from(&[], &["mips".to_string()]).is_err());
    }

    #[test]
    fn test_rules_command() {
        let rules = RulesCommand {
            build_mode: BuildMode::Release,
            deferred_components: false,
            target_platforms: vec![],
            abis: vec!["armeabi-v7a".to_string()],
        }
        .execute()
        .unwrap();
        assert_eq!(rules, vec!["android_aot_bundle_release_android-arm"]);
    }

    #[test]
    fn test_depfile_command() {
        let files = DepfileCommand {
            intermediate_dir: PathBuf::from("/out"),
        }
        .execute();
        assert_eq!(files, vec![PathBuf::from("/out/flutter_build.d")]);
    }

    #[tokio::test]
    async fn test_settings_fill_and_overrides_win() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("app")).unwrap();
        let file = tmp.path().join("assemble.toml");
        std::fs::write(
            &file,
            r#"
            source-dir = "app"
            intermediate-dir = "app/build"
            build-mode = "debug"
            target-platforms = ["android-arm"]
            "#,
        )
        .unwrap();

        let mut settings = ToolConfig::default();
        settings.flutter.root = Some(PathBuf::from("/sdk/flutter"));
        settings.flutter.min_sdk_version = Some(21);

        let overrides = Overrides {
            build_mode: Some(BuildMode::Profile),
            abis: vec!["arm64-v8a".to_string()],
            ..Default::default()
        };

        let config = load_configuration(&file, &settings, &overrides).await.unwrap();
        assert_eq!(config.flutter_root, PathBuf::from("/sdk/flutter"));
        assert_eq!(config.min_sdk_version, 21);
        assert_eq!(config.build_mode, BuildMode::Profile);
        assert_eq!(config.target_platforms, vec!["android-arm64"]);

        let line = PrintCommand {
            config_path: file.clone(),
            overrides,
        }
        .execute(&settings)
        .await
        .unwrap();
        assert!(line.ends_with("-dMinSdkVersion=21 android_aot_bundle_profile_android-arm64"));
    }

    #[tokio::test]
    async fn test_bad_settings_file_reported_plainly() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("settings.toml");
        std::fs::write(&file, "[flutter\nroot = 1").unwrap();

        let err = load_settings(Some(&file)).await.unwrap_err();
        assert!(err.to_string().starts_with("Settings file is not valid TOML:"));
    }

    #[tokio::test]
    async fn test_check_reports_missing_source_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("assemble.toml");
        std::fs::write(
            &file,
            r#"
            source-dir = "missing"
            intermediate-dir = "build"
            build-mode = "release"
            target-platforms = ["android-arm64"]
            min-sdk-version = 21
            flutter-root = "/sdk/flutter"
            "#,
        )
        .unwrap();

        let err = CheckCommand { config_path: file }
            .execute(&ToolConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid Flutter source directory:"));
    }
}
