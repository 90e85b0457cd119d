use crate::demo::{run_demo, run_scenario_listing, DemoArgs, ScenariosArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scenario_engine::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Scenario Simulation Engine",
    about = "Serve, browse, and play decision-making scenarios from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List the scenarios available to learners
    Scenarios(ScenariosArgs),
    /// Play one scenario end to end and print the graded result
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Register an extra authored scenario from a JSON file
    #[arg(long)]
    pub(crate) scenario_file: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scenarios(args) => run_scenario_listing(args),
        Command::Demo(args) => run_demo(args),
    }
}
