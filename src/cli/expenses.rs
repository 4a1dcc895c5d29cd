use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use super::resolve_settings;
use crate::error::Result;
use crate::fmt::won;
use crate::pipeline::read_analysed;
use crate::reports::top_categories;

pub fn run(input: &Path, top: usize, config: Option<&Path>) -> Result<()> {
    let settings = resolve_settings(config)?;
    let doc = read_analysed(input, &settings.roster())?;

    let total: i64 = doc.expense_by_category.values().map(|c| c.total).sum();
    if total == 0 {
        println!("No expenses found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "Count", "Share"]);
    for (label, stats) in top_categories(&doc.expense_by_category, top) {
        let share = stats.total as f64 / total as f64 * 100.0;
        table.add_row(vec![
            Cell::new(label),
            Cell::new(won(stats.total)).set_alignment(CellAlignment::Right),
            Cell::new(stats.count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{share:.1}%")).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(won(total)).set_alignment(CellAlignment::Right),
        Cell::new(""),
        Cell::new(""),
    ]);

    println!("{}\n{table}", "Expenses by category".red().bold());
    Ok(())
}
