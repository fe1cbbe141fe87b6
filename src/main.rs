//! CLI entry point for shiori

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shiori::Shiori;

#[derive(Parser)]
#[command(name = "shiori")]
#[command(version)]
#[command(about = "A minimalist static blog generator", long_about = None)]
struct Cli {
    /// Site directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the site into the output directory
    #[command(alias = "b")]
    Build {
        /// Rebuild when sources, theme or config change
        #[arg(short, long)]
        watch: bool,
    },

    /// Build once and serve the output directory
    Preview,

    /// Build, serve and rebuild on changes with live reload
    #[command(alias = "s")]
    Serve,

    /// Remove the output directory
    Clean,

    /// Create a new post
    New {
        /// Title of the new post
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "shiori=debug,tower_http=debug"
    } else {
        "shiori=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let site = Shiori::new(&base_dir)?;

    match cli.command {
        Commands::Build { watch } => {
            site.build()?;
            if watch {
                let site = site.clone();
                tokio::task::spawn_blocking(move || shiori::commands::build::watch(&site, |_| {}))
                    .await??;
            }
        }

        Commands::Preview => shiori::server::preview(&site).await?,

        Commands::Serve => shiori::server::serve(&site).await?,

        Commands::Clean => {
            site.clean()?;
            tracing::info!("Cleaned {:?}", site.output_dir);
        }

        Commands::New { title } => {
            let path = site.new_post(&title)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
