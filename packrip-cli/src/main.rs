mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliContext;
use packrip_core::PackripError;
use packrip_window::WindowError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "packrip")]
#[command(about = "packrip - timed card pack openings for stream chat")]
#[command(version)]
struct Cli {
    /// Data directory for the database and service config
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Service config file (defaults to <data-dir>/packrip.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Channel to operate on, overrides the service config
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collection config commands
    #[command(subcommand)]
    Config(commands::ConfigCommands),

    /// Viewer collection and leaderboard commands
    #[command(subcommand)]
    Viewer(commands::ViewerCommands),

    /// Rip a single pack for a viewer right now
    Rip {
        /// Viewer id
        viewer: String,
    },

    /// Run pack windows, reading chat lines from stdin
    Run(commands::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "packrip={0},packrip_core={0},packrip_window={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    let ctx = CliContext::load(data_dir, cli.config, cli.channel).await?;

    let result = match cli.command {
        Commands::Config(cmd) => commands::handle_config_command(cmd, &ctx).await,
        Commands::Viewer(cmd) => commands::handle_viewer_command(cmd, &ctx).await,
        Commands::Rip { viewer } => commands::handle_rip_command(&viewer, &ctx).await,
        Commands::Run(args) => commands::handle_run_command(args, &ctx).await,
    };

    if let Err(e) = result {
        if let Some(PackripError::Collection(msg)) = e.downcast_ref::<PackripError>() {
            eprintln!("Error: {}", msg);
            eprintln!("Sync a collection with 'packrip config sync <file>'");
        } else if let Some(WindowError::Configuration(msg)) = e.downcast_ref::<WindowError>() {
            eprintln!("Error: {}", msg);
            eprintln!("Sync a collection with 'packrip config sync <file>'");
        } else if let Some(PackripError::EmptyPool) = e.downcast_ref::<PackripError>() {
            eprintln!("Error: the active collection has no cards to draw");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
