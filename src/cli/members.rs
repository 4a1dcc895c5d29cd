use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use super::resolve_settings;
use crate::error::Result;
use crate::fmt::won;
use crate::pipeline::read_analysed;
use crate::reports::top_members;

pub fn run(input: &Path, top: usize, config: Option<&Path>) -> Result<()> {
    let settings = resolve_settings(config)?;
    let doc = read_analysed(input, &settings.roster())?;

    if doc.member_analysis.is_empty() {
        println!("No member payments found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Member", "Paid", "Payments", "Average", "Last payment"]);
    for (rank, (name, stats)) in top_members(&doc.member_analysis, top).into_iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(name),
            Cell::new(won(stats.total_paid)).set_alignment(CellAlignment::Right),
            Cell::new(stats.payment_count).set_alignment(CellAlignment::Right),
            Cell::new(won(stats.average_amount.round() as i64)).set_alignment(CellAlignment::Right),
            Cell::new(stats.last_payment_date.clone().unwrap_or_default()),
        ]);
    }

    let total: i64 = doc.member_analysis.values().map(|s| s.total_paid).sum();
    println!("{}\n{table}", "Member contributions".bold());
    println!(
        "{} members paid {} in total",
        doc.member_analysis.len(),
        won(total).green()
    );
    Ok(())
}
