mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// forgelink CLI -- resolve GitHub issue, pull request and discussion
/// references in text.
#[derive(Parser)]
#[command(name = "forgelink", version, about)]
struct Cli {
    /// Config file (defaults to ~/.forgelink/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every reference found in TEXT.
    Resolve {
        /// Text to scan, e.g. "see rust-lang/rust#1".
        text: String,
        /// Organisation assumed for references written as `repo#123`.
        #[arg(long)]
        org: Option<String>,
        /// Also pick up full https://github.com/... issue and pull URLs.
        #[arg(long)]
        full_urls: bool,
        /// Fall back to discussions when an issue number is not found.
        #[arg(long)]
        discussions: bool,
        /// Print outcomes as JSON instead of summary lines.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    if cli.log_json {
        fl_telemetry::logging::init_logging_json("forgelink", &config.general.log_level);
    } else {
        fl_telemetry::logging::init_logging("forgelink", &config.general.log_level);
    }

    match cli.command {
        Commands::Resolve {
            text,
            org,
            full_urls,
            discussions,
            json,
        } => {
            let options = commands::resolve::ResolveOptions {
                org,
                full_urls,
                discussions,
                json,
            };
            commands::resolve::run(config, &text, options).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
