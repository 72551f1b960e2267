//! Main entry point for sheetledger CLI

use clap::Parser;
use sheetledger::cli::Cli;
use sheetledger::commands::{execute_command, GlobalOptions};

fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set up verbose logging if requested
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let options = GlobalOptions {
        config: cli.config,
        format: cli.format,
        show_progress: !cli.no_progress,
    };

    // Execute the command
    if let Err(e) = execute_command(cli.command, &options) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
