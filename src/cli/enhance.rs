use std::path::Path;

use colored::Colorize;

use super::resolve_settings;
use crate::error::Result;
use crate::pipeline::{enhance, read_base, write_json};

pub fn run(input: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let settings = resolve_settings(config)?;
    let roster = settings.roster();
    if roster.is_empty() {
        tracing::warn!("member roster is empty; no payments will be attributed");
    }

    let doc = enhance(read_base(input)?, &roster);
    write_json(&doc, output)?;

    println!(
        "{} members, {} expense categories, {} months",
        doc.member_analysis.len(),
        doc.expense_by_category.len(),
        doc.monthly_trends.len()
    );
    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}
