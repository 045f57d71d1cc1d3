use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seed_kernel::{OnExisting, Settings};

#[derive(Debug, Parser)]
#[command(name = "seed-cli", version, about = "Provision scoped MongoDB service accounts")]
struct Cli {
    /// Directory holding base.toml and <env>.toml (overrides SEED_CONFIG_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create every configured user on the admin database
    Seed {
        /// Treat users that already exist as skipped instead of failing
        #[arg(long)]
        skip_existing: bool,
    },
    /// Check each configured user exists with exactly its scoped role
    Verify,
    /// Print the users that would be created, without contacting the server
    Plan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_with_dir(cli.config_dir)
        .with_context(|| "failed to load mongo-seed settings")?;
    seed_telemetry::init(&settings.telemetry);

    tracing::debug!(env = ?settings.environment, command = ?cli.command, "seed-cli starting");

    match cli.command {
        Command::Seed { skip_existing } => {
            if skip_existing {
                settings.seed.on_existing = OnExisting::Skip;
            }
            let report = mongo_seed::run_seed(&settings).await?;
            println!(
                "created {} user(s), skipped {}",
                report.created.len(),
                report.skipped.len()
            );
        }
        Command::Verify => {
            mongo_seed::run_verify(&settings).await?;
            println!("all users verified");
        }
        Command::Plan => {
            let specs = mongo_seed::user_specs(&settings)
                .with_context(|| "invalid user configuration")?;
            for spec in &specs {
                println!("{}\t{}\t{}", spec.username(), spec.role(), spec.database());
            }
        }
    }

    Ok(())
}
