use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbox_core::Kbox;
use tracing_subscriber::EnvFilter;

mod commands;

/// Kbox - A plugin-driven development environment tool
#[derive(Parser)]
#[command(name = "kbox")]
#[command(about = "A plugin-driven development environment tool")]
#[command(version)]
struct Cli {
    /// Path to the global config file
    #[arg(short, long, default_value = ".kbox/config.yml")]
    config: PathBuf,

    /// Directory of the app to load (skipped when it has no kbox.yml)
    #[arg(short, long, default_value = ".")]
    app: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the command menu, optionally below a group
    Tasks {
        /// Path of the group to start from
        path: Vec<String>,
    },
    /// Run a task; words after the task are passed to it
    Run {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Show where a plugin resolves from
    Which {
        /// Plugin name
        plugin: String,
    },
    /// Print the JSON schema of plugin.yml
    Schema,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second subscriber only happens in tests; nothing to report then.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // The schema does not depend on any config
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    let mut kbox = Kbox::load(&cli.config)
        .with_context(|| format!("Failed to initialize kbox from {}", cli.config.display()))?;

    commands::report_plugins(&kbox.init_global_plugins().await);
    if let Some(report) = kbox
        .load_app(&cli.app)
        .await
        .with_context(|| format!("Failed to load app in {}", cli.app.display()))?
    {
        commands::report_plugins(&report);
    }
    tracing::debug!(tasks = kbox.tasks().count()?, "kbox ready");

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Tasks { path } => commands::tasks::execute(&kbox, &path),
        Commands::Run { argv } => commands::run::execute(&kbox, &argv).await,
        Commands::Which { plugin } => commands::which::execute(&kbox, &plugin),
        Commands::Schema => commands::schema::execute(),
    }
}
