use crate::demo::{run_demo, run_export, DemoArgs, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hostel_allocation::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hostel Allocation Service",
    about = "Run and demonstrate the hostel allocation service from the command line",
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
    /// Walk a seeded campus through application, scoring, and approval
    Demo(DemoArgs),
    /// Print a CSV report for the seeded demo dataset
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Preload two sample hostels with rooms before serving
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Export(args) => run_export(args),
    }
}
