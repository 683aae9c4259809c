mod backend;
mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::backend::Backend;
use crate::cli::{Cli, Commands};
use crate::output::OutputFormat;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("regsettings=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::from_flag(cli.json);
    let backend = Backend::open(&cli.store)?;

    match &cli.command {
        Commands::Schemas => commands::schemas::run(&backend, format),
        Commands::Get(args) => commands::value::get(&backend, args, format),
        Commands::Set(args) => commands::value::set(&backend, args),
        Commands::Reset(args) => commands::value::reset(&backend, args),
        Commands::List(args) => commands::value::list(&backend, args, format),
        Commands::Dump => commands::dump::run(&backend, format),
        Commands::Monitor(args) => commands::monitor::run(&backend, args, format),
    }
}
