//! flutter-assemble command-line entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flutter_assemble::build::BuildMode;
use flutter_assemble::commands::{
    load_settings, AssembleCommand, CheckCommand, DepfileCommand, Overrides, PrintCommand,
    RulesCommand,
};
use flutter_assemble::core::{ToolConfig, APP_NAME, VERSION};

#[derive(Parser)]
#[command(
    name = "flutter-assemble",
    version,
    about = "Run `flutter assemble` for an Android build step"
)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the build file and run flutter assemble.
    Assemble {
        /// Build step file (TOML)
        config: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Print the flutter invocation without running it.
    Print {
        config: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Check that the source directory exists.
    Check { config: PathBuf },
    /// Print the rule names for a mode and platform list.
    Rules {
        #[arg(long)]
        mode: BuildMode,
        #[arg(long)]
        deferred_components: bool,
        #[arg(long = "platform")]
        platforms: Vec<String>,
        #[arg(long = "abi")]
        abis: Vec<String>,
    },
    /// Print the dependency file declared for an intermediate directory.
    Depfile { intermediate_dir: PathBuf },
}

#[derive(Args)]
struct OverrideArgs {
    /// Override the build mode
    #[arg(long)]
    mode: Option<BuildMode>,
    /// Pass --verbose to flutter
    #[arg(short, long)]
    verbose: bool,
    /// Replace the target platforms (repeatable)
    #[arg(long = "platform")]
    platforms: Vec<String>,
    /// Replace the target platforms by Android ABI name (repeatable)
    #[arg(long = "abi")]
    abis: Vec<String>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            build_mode: args.mode,
            verbose: args.verbose,
            target_platforms: args.platforms,
            abis: args.abis,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref()).await?;
    init_logging(&settings);
    info!("{} v{}", APP_NAME, VERSION);

    match cli.command {
        Command::Assemble { config, overrides } => {
            let output = AssembleCommand {
                config_path: config,
                overrides: overrides.into(),
            }
            .execute(&settings)
            .await?;
            for depfile in output.dependency_files.iter() {
                println!("{}", depfile.display());
            }
        }
        Command::Print { config, overrides } => {
            let line = PrintCommand {
                config_path: config,
                overrides: overrides.into(),
            }
            .execute(&settings)
            .await?;
            println!("{}", line);
        }
        Command::Check { config } => {
            let source_dir = CheckCommand { config_path: config }.execute(&settings).await?;
            println!("ok: {}", source_dir.display());
        }
        Command::Rules {
            mode,
            deferred_components,
            platforms,
            abis,
        } => {
            let rules = RulesCommand {
                build_mode: mode,
                deferred_components,
                target_platforms: platforms,
                abis,
            }
            .execute()?;
            for rule in rules {
                println!("{}", rule);
            }
        }
        Command::Depfile { intermediate_dir } => {
            for path in (DepfileCommand { intermediate_dir }).execute() {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the settings filter.
fn init_logging(settings: &ToolConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
