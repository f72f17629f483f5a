mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stepflow",
    version,
    about = "Runs configuration-driven record pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the integration configuration document
    #[arg(short, long, default_value = "integrationconfig.xml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one job from the configuration
    Run {
        /// Job id
        job: String,
        /// Also print the run result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the jobs defined in the configuration
    Jobs,
    /// List registered step types and their properties
    Steps,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { job, json } => commands::run::execute(&cli.config, &job, json),
        Commands::Jobs => commands::jobs::execute(&cli.config),
        Commands::Steps => commands::steps::execute(),
    }
}
