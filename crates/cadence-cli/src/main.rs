mod client;
mod commands;
mod daemon_launcher;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{PlanCommand, WorkTimeArgs};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence CLI - focus sessions with work and break segments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a focus session (launches the daemon if needed)
    Start {
        /// Plan name (defaults to the configured plan)
        #[arg(short, long)]
        plan: Option<String>,
        #[command(flatten)]
        work_time: WorkTimeArgs,
    },
    /// Start the next segment, skipping the current one if it still runs
    Next,
    /// Pause the running segment
    Pause,
    /// Resume the paused segment
    Resume,
    /// Discard the current session
    Stop {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the timer status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the timer live until the session ends
    Watch,
    /// Show the sequence a session would run, without starting it
    Preview {
        /// Plan name (defaults to the configured plan)
        #[arg(short, long)]
        plan: Option<String>,
        #[command(flatten)]
        work_time: WorkTimeArgs,
    },
    /// Manage stored focus plans
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { plan, work_time } => commands::start(plan, work_time).await,
        Commands::Next => commands::next().await,
        Commands::Pause => commands::pause().await,
        Commands::Resume => commands::resume().await,
        Commands::Stop { yes } => commands::stop(yes).await,
        Commands::Status { json } => commands::status(json).await,
        Commands::Watch => commands::watch().await,
        Commands::Preview { plan, work_time } => commands::preview(plan, work_time).await,
        Commands::Plan { command } => commands::plan(command),
    }
}
