//! CLI frontend for Dreamwalk chat-fiction scripts.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dw_core::StateId;
use dw_dsl::ScriptConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "dw",
    about = "Dreamwalk: check, inspect, and play branching chat-fiction scripts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Marker that flags a terminal state as lethal
    #[arg(long, global = true)]
    lethal_marker: Option<String>,

    /// Marker every victory state must carry (default: none required)
    #[arg(long, global = true)]
    victory_marker: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a script, reporting diagnostics
    Check {
        /// Script file
        script: PathBuf,
    },

    /// List the states of a script
    List {
        /// Script file
        script: PathBuf,
    },

    /// Show one state in detail
    Show {
        /// Script file
        script: PathBuf,

        /// State id
        id: StateId,
    },

    /// Export the parsed script
    Export {
        /// Script file
        script: PathBuf,

        /// Output format: json, script
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play a script in the terminal
    Play {
        /// Script file
        script: PathBuf,

        /// RNG seed for reproducible money rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON file overriding the engine's phrases
        #[arg(short, long)]
        phrases: Option<PathBuf>,

        /// Multiplier for break pauses (0 disables them)
        #[arg(long, default_value = "1.0")]
        wait_scale: f64,

        /// Balance at which the `money` tag is granted
        #[arg(long, default_value = "15")]
        money_threshold: u32,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dw_fiction=warn,dw_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ScriptConfig::default();
    if let Some(marker) = cli.lethal_marker {
        config = config.with_lethal_marker(marker);
    }
    if let Some(marker) = cli.victory_marker {
        config = config.with_victory_marker(marker);
    }

    let result = match cli.command {
        Commands::Check { script } => commands::check::run(&script, &config),
        Commands::List { script } => commands::list::run(&script, &config),
        Commands::Show { script, id } => commands::show::run(&script, &config, id),
        Commands::Export {
            script,
            format,
            output,
        } => commands::export::run(&script, &config, &format, output.as_deref()),
        Commands::Play {
            script,
            seed,
            phrases,
            wait_scale,
            money_threshold,
        } => commands::play::run(
            &script,
            &config,
            commands::play::PlayOptions {
                seed,
                phrases,
                wait_scale,
                money_threshold,
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
