//! FitCoach CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write the default config and create the documents folder
//! - `chat`     — Interactive coaching session
//! - `ask`      — Single question, single answer
//! - `status`   — Knowledge base and provider summary

use clap::{Parser, Subcommand};

mod commands;

use commands::TurnFlags;

#[derive(Parser)]
#[command(
    name = "fitcoach",
    about = "FitCoach — a retrieval-augmented fitness and nutrition coach",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration and create the documents folder
    Onboard {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Chat with the coach interactively
    Chat {
        #[command(flatten)]
        turn: TurnFlags,

        /// Start on this thread id instead of a new one
        #[arg(long)]
        thread: Option<String>,
    },

    /// Ask a single question
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        #[command(flatten)]
        turn: TurnFlags,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Show knowledge base and provider status
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard { force } => commands::onboard::run(force).await?,
        Commands::Chat { turn, thread } => commands::chat::run(turn, thread).await?,
        Commands::Ask {
            message,
            turn,
            stream,
        } => commands::ask::run(message, turn, stream).await?,
        Commands::Status { json } => commands::status::run(json).await?,
    }

    Ok(())
}
