pub mod config;
pub mod enhance;
pub mod expenses;
pub mod members;
pub mod run;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::won;
use crate::importer::SourceSpec;
use crate::models::Summary;
use crate::settings::{load_settings, load_settings_from, Settings};

pub(crate) fn parse_sources(specs: &[String]) -> Result<Vec<SourceSpec>> {
    specs.iter().map(|s| s.parse()).collect()
}

pub(crate) fn resolve_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => load_settings_from(path),
        None => Ok(load_settings()),
    }
}

pub(crate) fn print_summary(summary: &Summary) {
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![
        Cell::new("Income".green().bold()),
        Cell::new(won(summary.total_income)),
    ]);
    table.add_row(vec![Cell::new("  Interest"), Cell::new(won(summary.total_interest))]);
    table.add_row(vec![
        Cell::new("Expense".red().bold()),
        Cell::new(won(summary.total_expense)),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);
    table.add_row(vec![Cell::new("Main balance"), Cell::new(won(summary.main_balance))]);
    table.add_row(vec![Cell::new("Safe box"), Cell::new(won(summary.safebox_balance))]);
    table.add_row(vec![
        Cell::new("Total balance".bold()),
        Cell::new(won(summary.total_balance)),
    ]);
    println!("{table}");
    println!(
        "{} transactions, {} internal transfers excluded from totals",
        summary.total_transactions, summary.internal_transfers
    );
}

#[derive(Parser)]
#[command(
    name = "duesbook",
    version,
    about = "Turn a dues fund's bank exports into a dashboard JSON document."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/duesbook/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run both stages and write the analysed document.
    Run {
        /// Sources as kind:path[#sheet] (kinds: ledger, safebox, primary, secondary) or a bare path
        #[arg(required = true)]
        sources: Vec<String>,
        /// Output path
        #[arg(short, long, default_value = "enhanced_dashboard_data.json")]
        output: PathBuf,
        /// Also write the base document here
        #[arg(long = "base-out")]
        base_out: Option<PathBuf>,
    },
    /// Base stage only: normalize, reconcile and summarize.
    Process {
        /// Sources as kind:path[#sheet] or a bare path
        #[arg(required = true)]
        sources: Vec<String>,
        /// Output path
        #[arg(short, long, default_value = "dashboard_data.json")]
        output: PathBuf,
    },
    /// Analysis stage over a base document.
    Enhance {
        /// Base document written by `process`
        input: PathBuf,
        /// Output path
        #[arg(short, long, default_value = "enhanced_dashboard_data.json")]
        output: PathBuf,
    },
    /// Show member contributions.
    Members {
        /// Base or analysed document
        input: PathBuf,
        /// Number of members to list
        #[arg(long, default_value = "20")]
        top: usize,
    },
    /// Show expenses by detailed category.
    Expenses {
        /// Base or analysed document
        input: PathBuf,
        /// Number of categories to list
        #[arg(long, default_value = "20")]
        top: usize,
    },
    /// Inspect or create the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings.
    Show,
    /// Write a default settings file.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
