mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{lead::LeadSubcommand, reminder::ReminderSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "leadflow",
    about = "CRM pipeline state machine — manage leads, stage transitions, and follow-up reminders",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: auto-detect from .leadflow/)
    #[arg(long, global = true, env = "LEADFLOW_HOME")]
    data_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a leadflow data directory
    Init,

    /// Manage leads
    Lead {
        #[command(subcommand)]
        subcommand: LeadSubcommand,
    },

    /// Advance a lead through the pipeline (forward-only; silently a no-op
    /// otherwise)
    Advance {
        /// Lead id
        id: String,
        /// Target stage name (e.g. contacted, proposal_sent)
        stage: String,
        /// Trigger description recorded in the activity log
        #[arg(long, default_value = "manual_advance")]
        trigger: String,
    },

    /// Manage follow-up reminders
    Reminder {
        #[command(subcommand)]
        subcommand: ReminderSubcommand,
    },

    /// Show the activity log for a lead
    Activity {
        /// Lead id
        id: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let data_dir = cli.data_dir.as_deref();
    let root = root::resolve_root(data_dir);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Lead { subcommand } => cmd::lead::run(&root, subcommand, cli.json),
        Commands::Advance { id, stage, trigger } => {
            cmd::advance::run(&root, &id, &stage, &trigger, cli.json)
        }
        Commands::Reminder { subcommand } => cmd::reminder::run(&root, subcommand, cli.json),
        Commands::Activity { id } => cmd::activity::run(&root, &id, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
