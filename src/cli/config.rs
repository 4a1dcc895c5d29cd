use std::path::Path;

use super::resolve_settings;
use crate::error::{DuesError, Result};
use crate::settings::{save_settings, settings_path, Settings};

pub fn show(config: Option<&Path>) -> Result<()> {
    let settings = resolve_settings(config)?;
    let path = config.map(Path::to_path_buf).unwrap_or_else(settings_path);
    let state = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("# {}{state}", path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn init(config: Option<&Path>, force: bool) -> Result<()> {
    let path = config.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if path.exists() && !force {
        return Err(DuesError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_settings(&Settings::default(), &path)?;
    println!("Wrote default settings to {}", path.display());
    println!("Add member names under \"known_members\" to enable attribution.");
    Ok(())
}
