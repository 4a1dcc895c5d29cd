use std::path::Path;

use colored::Colorize;

use super::{parse_sources, print_summary, resolve_settings};
use crate::error::Result;
use crate::pipeline::{enhance, load_sources, process, write_json};

/// Base stage only.
pub fn base(sources: &[String], output: &Path, config: Option<&Path>) -> Result<()> {
    let settings = resolve_settings(config)?;
    let intake = load_sources(&parse_sources(sources)?)?;
    let doc = process(intake.rows, &settings, intake.sources);

    write_json(&doc, output)?;
    print_summary(&doc.summary);
    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}

/// Both stages in memory, optionally checkpointing the base document.
pub fn full(
    sources: &[String],
    output: &Path,
    base_out: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let settings = resolve_settings(config)?;
    let intake = load_sources(&parse_sources(sources)?)?;
    let base = process(intake.rows, &settings, intake.sources);

    if let Some(path) = base_out {
        write_json(&base, path)?;
        println!("{} {}", "Wrote".green(), path.display());
    }

    let doc = enhance(base, &settings.roster());
    write_json(&doc, output)?;
    print_summary(&doc.base.summary);
    println!(
        "{} members attributed, {} expense categories, {} months",
        doc.member_analysis.len(),
        doc.expense_by_category.len(),
        doc.monthly_trends.len()
    );
    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}
