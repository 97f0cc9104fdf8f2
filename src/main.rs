use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use plugsmith::engine::{DryRunEngineClient, EngineClient, HttpEngineClient};
use plugsmith::plugins::PluginManager;
use plugsmith::{Config, ErrorStatus, PlugsmithError};

#[derive(Parser)]
#[command(name = "plugsmith")]
#[command(about = "Install plugin record trees into a data engine", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.plugsmith/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a plugin directory
    Install {
        /// Plugin root (the directory holding plugin.json)
        dir: PathBuf,
        /// Fail on any unresolved placeholder
        #[arg(long)]
        strict: bool,
        /// Log records instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a plugin directory without contacting the engine
    Validate {
        dir: PathBuf,
        #[arg(long)]
        strict: bool,
    },
    /// Remove an installed plugin (not supported)
    Uninstall { dir: PathBuf },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "plugsmith=debug" } else { "plugsmith=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Some(Commands::Version) | None => {
            println!("plugsmith {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Install {
            dir,
            strict,
            dry_run,
        }) => {
            let mut config = Config::load(cli.config.as_deref())?;
            config.install.strict |= strict;

            let client: Arc<dyn EngineClient> = if dry_run {
                Arc::new(DryRunEngineClient::new())
            } else {
                Arc::new(
                    HttpEngineClient::new(&config.engine)?
                        .with_entities_collection(config.install.base_entities_target.clone()),
                )
            };
            info!(engine = client.name(), plugin = %dir.display(), "Installing plugin");

            let report = PluginManager::new(client, config.install)
                .install(&dir)
                .await?;
            println!("{}", report);
            if !report.is_success() {
                return Ok(ExitCode::from(1));
            }
        }
        Some(Commands::Validate { dir, strict }) => {
            let mut config = Config::load(cli.config.as_deref())?;
            config.install.strict |= strict;

            let wrapper = manager_for_validation(config)
                .validate(&dir)
                .await?;
            println!(
                "{} {} is valid: {} group(s), {} file(s)",
                wrapper.config.id,
                wrapper.config.version,
                wrapper.content_map.len(),
                wrapper.file_count()
            );
        }
        Some(Commands::Uninstall { dir }) => {
            let config = Config::load(cli.config.as_deref())?;
            manager_for_validation(config)
                .uninstall(Path::new(&dir))
                .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn manager_for_validation(config: Config) -> PluginManager {
    PluginManager::new(Arc::new(DryRunEngineClient::new()), config.install)
}

/// Input problems exit with 2, everything else with 1.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<PlugsmithError>().map(PlugsmithError::status) {
        Some(ErrorStatus::InputValidation) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}
