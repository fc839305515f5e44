//! `rtflow`: inspección de build plans desde la terminal.
//!
//! Códigos de salida: 0 ok, 1 error general, 2 prefijo ambiguo,
//! 3 sin coincidencias, 4 uso inválido (plataforma o url).

mod commands;
mod errors;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::commands::ListFlags;
use crate::errors::CliError;

#[derive(Parser, Debug)]
#[command(name = "rtflow")]
#[command(about = "Resolve build plans into runtime and buildtime artifact sets")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Build plan JSON file
    #[arg(long, value_name = "FILE")]
    plan: PathBuf,

    #[command(flatten)]
    platform: PlatformArg,
}

#[derive(Args, Debug)]
struct PlatformArg {
    /// Host platform id
    #[arg(long, env = "RTFLOW_PLATFORM_ID", value_name = "ID")]
    platform: Option<String>,
}

impl PlatformArg {
    fn require(&self) -> Result<&str, CliError> { self.platform.as_deref().ok_or(CliError::MissingPlatform) }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resolved artifacts, sorted by name
    Artifacts {
        #[command(flatten)]
        plan: PlanArgs,
        /// Include artifacts that are not directly installable
        #[arg(long)]
        all: bool,
        /// Print full artifact ids
        #[arg(long)]
        full_id: bool,
        /// List the buildtime closure instead of the runtime one
        #[arg(long)]
        buildtime: bool,
        #[arg(long)]
        json: bool,
    },
    /// Copy an artifact, selected by id prefix, into a directory
    Download {
        id_prefix: String,
        #[command(flatten)]
        plan: PlanArgs,
        #[arg(long, value_name = "DIR", default_value = ".")]
        target: PathBuf,
    },
    /// Show what changes between two build plans
    Changes {
        #[arg(long, value_name = "FILE")]
        old: PathBuf,
        #[arg(long, value_name = "FILE")]
        new: PathBuf,
        #[command(flatten)]
        platform: PlatformArg,
    },
    /// Show the recursive runtime dependencies of an artifact
    Deps {
        id_prefix: String,
        #[command(flatten)]
        plan: PlanArgs,
    },
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                                                      if verbose {
                                                          EnvFilter::new("debug")
                                                      } else {
                                                          EnvFilter::new("warn")
                                                      }
                                                  });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn run(cli: Cli) -> Result<String, CliError> {
    match cli.command {
        Command::Artifacts { plan, all, full_id, buildtime, json } => {
            let platform = plan.platform.require()?;
            commands::artifacts(commands::load_plan(&plan.plan)?, platform, ListFlags { all, full_id, buildtime, json })
        }
        Command::Download { id_prefix, plan, target } => {
            let platform = plan.platform.require()?;
            let written = commands::download(commands::load_plan(&plan.plan)?, platform, &id_prefix, &target)?;
            Ok(format!("{}\n", written.display()))
        }
        Command::Changes { old, new, platform } => {
            let platform = platform.require()?;
            commands::changes(commands::load_plan(&old)?, commands::load_plan(&new)?, platform)
        }
        Command::Deps { id_prefix, plan } => {
            let platform = plan.platform.require()?;
            commands::deps(commands::load_plan(&plan.plan)?, platform, &id_prefix)
        }
    }
}

fn main() -> ExitCode {
    // .env opcional con RTFLOW_PLATFORM_ID
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(out) => {
            print!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[rtflow] {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
