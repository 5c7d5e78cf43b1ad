//! kubegraph - relationship graphs for Kubernetes objects

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{ConfigSubcommand, GraphArgs};

/// Build the relationship graph around a Kubernetes object
#[derive(Parser, Debug)]
#[command(name = "kubegraph", version)]
#[command(about = "Build the relationship graph around a Kubernetes object", long_about = None)]
struct Args {
    /// Write debug logs to a temporary file
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the graph around one object
    Graph(GraphArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_path) = cli::init_logging(args.debug) {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    match args.command {
        Command::Graph(graph) => cli::run_graph(graph, args.context).await,
        Command::Config { subcommand } => cli::handle_config_command(subcommand),
    }
}
