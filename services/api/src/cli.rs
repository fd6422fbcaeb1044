use crate::commands::{
    run_ingest, run_students, run_task_status, run_tasks, IngestArgs, TaskStatusArgs, TasksArgs,
};
use crate::demo::run_demo;
use crate::server;
use clap::{Args, Parser, Subcommand};
use offerflow::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "offerflow",
    about = "Reconcile parsed offer letters into student, application and task records",
    version
)]
struct Cli {
    /// Override the configured data directory (OFFERFLOW_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Reconcile an extraction JSON payload stored on disk
    Ingest(IngestArgs),
    /// List students with their applications
    Students,
    /// List follow-up tasks with student and university context
    Tasks(TasksArgs),
    /// Mark a task pending or done
    TaskStatus(TaskStatusArgs),
    /// Reconcile built-in sample offers into a throwaway ledger
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, data_dir).await,
        Command::Ingest(args) => run_ingest(args, data_dir),
        Command::Students => run_students(data_dir),
        Command::Tasks(args) => run_tasks(args, data_dir),
        Command::TaskStatus(args) => run_task_status(args, data_dir),
        Command::Demo => run_demo(),
    }
}
