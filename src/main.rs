//! Codegraph CLI - symbol graph builder and seed-file query tool for C#

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(version)]
#[command(about = "Build a symbol graph of C# projects and find files related to a change")]
#[command(long_about = r#"
Codegraph parses a set of C# projects into a graph of classes, interfaces and
methods linked by call, inheritance and implementation relationships, then
answers "which files are related to these files" from that graph.

Example usage:
  codegraph index projects.txt -o codegraph.json
  codegraph query -g codegraph.json -s src/Orders/OrderService.cs
  codegraph impact -g codegraph.json -s src/Orders/OrderService.cs
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./codegraph.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the projects listed in a manifest into a graph file
    Index {
        /// Manifest file: one project path (.csproj, .proj, .sln) per line
        manifest: PathBuf,

        /// Output graph file [default: codegraph.json]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Parser worker threads [default: available parallelism]
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Do not record InheritsFrom / Implements relationships
        #[arg(long)]
        no_inheritance: bool,
    },

    /// Print the files related to the seed files as a JSON array
    Query {
        /// Graph file written by `index`
        #[arg(short, long = "graph-file", alias = "graph")]
        graph_file: PathBuf,

        /// Seed files
        #[arg(short, long = "seed-files", alias = "seeds", num_args = 1.., required = true)]
        seed_files: Vec<String>,
    },

    /// Print the dependents and dependencies of the seed files as JSON
    Impact {
        /// Graph file written by `index`
        #[arg(short, long = "graph-file", alias = "graph")]
        graph_file: PathBuf,

        /// Seed files
        #[arg(short, long = "seed-files", alias = "seeds", num_args = 1.., required = true)]
        seed_files: Vec<String>,
    },

    /// Show statistics about a graph file
    Stats {
        /// Graph file written by `index`
        #[arg(short, long = "graph-file", alias = "graph")]
        graph_file: PathBuf,
    },

    /// Write a starter codegraph.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for command payloads
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Index {
            manifest,
            output,
            jobs,
            no_inheritance,
        } => commands::run_index(config, &manifest, output, jobs, no_inheritance),
        Commands::Query { graph_file, seed_files } => commands::run_query(&graph_file, &seed_files),
        Commands::Impact { graph_file, seed_files } => commands::run_impact(&graph_file, &seed_files),
        Commands::Stats { graph_file } => commands::run_stats(&graph_file),
        Commands::Init { force } => commands::run_init(config, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
