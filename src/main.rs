use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use plisn_uploader::{appearance, commands, config};

#[derive(Debug, Parser)]
#[command(name = "plisn", version, about = "Upload picked photos or file them into an album")]
struct Cli {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Endpoint base URL, overriding the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// POST each picked image to <base-url>/upload/image<N>.jpg
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Create a YYYYMMDD_HHMMSS album in the library and copy the images in
    Album {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the active configuration
    Config {
        /// Restore defaults (the old file is kept as a backup)
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::get_config_path().context("Failed to locate config file")?,
    };
    // A reset must not depend on the old file passing validation
    let reset = matches!(cli.command, Command::Config { reset: true });
    let mut app_config = commands::load_or_reset_config(&config_path, reset)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging; RUST_LOG wins over the config file
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(app_config.log_level.clone()),
    )
    .init();

    if let Some(base_url) = cli.base_url {
        app_config.base_url = base_url;
        config::validate_config(&app_config).context("Invalid --base-url")?;
    }

    let styling = appearance::install(app_config.appearance.clone())
        .context("Failed to apply navigation appearance")?;
    log::info!("Starting {}", styling.title);

    match cli.command {
        Command::Upload { paths } => {
            let summary = commands::run_upload(&app_config, paths).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Album { paths } => {
            let summary = commands::run_album(&app_config, paths).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Config { .. } => {
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&app_config)?);
        }
    }

    Ok(())
}
