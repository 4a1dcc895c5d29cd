mod classifier;
mod cli;
mod error;
mod fmt;
mod importer;
mod ledger;
mod members;
mod models;
mod normalize;
mod pipeline;
mod reports;
mod settings;
mod transfers;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn main() {
    let cli = Cli::parse();
    init_logger(log_level(cli.verbose, cli.quiet));

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run {
            sources,
            output,
            base_out,
        } => cli::run::full(&sources, &output, base_out.as_deref(), config),
        Commands::Process { sources, output } => cli::run::base(&sources, &output, config),
        Commands::Enhance { input, output } => cli::enhance::run(&input, &output, config),
        Commands::Members { input, top } => cli::members::run(&input, top, config),
        Commands::Expenses { input, top } => cli::expenses::run(&input, top, config),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(config),
            ConfigCommands::Init { force } => cli::config::init(config, force),
        },
    };

    if let Err(e) = result {
        tracing::debug!("{e:?}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        // RUST_LOG wins over -v/-q.
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
