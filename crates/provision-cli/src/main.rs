//! The `provision` binary.

use clap::{Parser, Subcommand, ValueEnum};
use provision_config::Environment;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "Provision Harness - starter template infrastructure tool")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "starter-config.json")]
    config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How run results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable status lines and tables
    Text,
    /// A JSON report document
    Json,
}

/// Environment selector shared by the provisioning commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvArg {
    /// Development only
    Dev,
    /// Test only
    Test,
    /// Production only
    Prod,
    /// All three environments
    All,
}

impl EnvArg {
    /// The environments this selector expands to
    pub fn environments(self) -> Vec<Environment> {
        match self {
            EnvArg::Dev => vec![Environment::Dev],
            EnvArg::Test => vec![Environment::Test],
            EnvArg::Prod => vec![Environment::Prod],
            EnvArg::All => Environment::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Provision resources
    Setup {
        #[command(subcommand)]
        target: SetupTarget,
    },

    /// Reconcile federated credentials against the service connections
    FixCredentials {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,
    },

    /// Show which resources currently exist
    Status {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,
    },

    /// Delete everything the harness created
    Cleanup {
        /// Skip the typed confirmation phrase
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SetupTarget {
    /// Resource groups, AI Services accounts and AI projects
    Azure {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,

        /// Report what would change without mutating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// App registration, service principal and role assignments
    Identity {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,

        /// Report what would change without mutating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Repository, service connections, variable groups, environments
    /// and pipeline
    Devops {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,

        /// Report what would change without mutating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Everything, in dependency order
    All {
        /// Target environment
        #[arg(short, long, default_value = "all")]
        environment: EnvArg,

        /// Report what would change without mutating anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Map an error that escaped a command to the documented exit codes:
/// domain failures are `1`, anything unexpected is `2`.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<provision_config::ConfigError>().is_some()
        || error.downcast_ref::<provision_core::Error>().is_some()
    {
        1
    } else {
        2
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = smol::block_on(async {
        match cli.command {
            Commands::Validate => commands::validate::run(&cli.config).await,
            Commands::Setup { target } => {
                commands::setup::run(&cli.config, cli.output, target).await
            }
            Commands::FixCredentials { environment } => {
                commands::fix_credentials::run(&cli.config, cli.output, environment).await
            }
            Commands::Status { environment } => {
                commands::status::run(&cli.config, cli.output, environment).await
            }
            Commands::Cleanup { force } => commands::cleanup::run(&cli.config, force).await,
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
