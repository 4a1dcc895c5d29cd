use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DuesError, Result};
use crate::members::Roster;
use crate::transfers::DEFAULT_TOLERANCE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default = "default_primary")]
    pub primary: AccountMeta,
    #[serde(default = "default_safe_box")]
    pub safe_box: AccountMeta,
    #[serde(default = "default_secondary")]
    pub secondary: AccountMeta,
}

fn default_primary() -> AccountMeta {
    AccountMeta {
        account_number: None,
        description: "카카오뱅크 저축예금".to_string(),
    }
}

fn default_safe_box() -> AccountMeta {
    AccountMeta {
        account_number: None,
        description: "안전 자산 운용".to_string(),
    }
}

fn default_secondary() -> AccountMeta {
    AccountMeta {
        account_number: None,
        description: "신한은행 (폐쇄)".to_string(),
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            safe_box: default_safe_box(),
            secondary: default_secondary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub known_members: Vec<String>,
    #[serde(default = "default_tolerance")]
    pub transfer_tolerance: i64,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            known_members: Vec::new(),
            transfer_tolerance: default_tolerance(),
            accounts: AccountsConfig::default(),
        }
    }
}

impl Settings {
    pub fn roster(&self) -> Roster {
        Roster::new(self.known_members.iter().cloned())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("duesbook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Settings from the default location, or defaults when there is no file.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("ignoring {}: {e}", path.display());
            Settings::default()
        }
    }
}

/// Settings from an explicit file; a missing or malformed file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DuesError::Settings(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| DuesError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DuesError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            known_members: vec!["김민주".to_string(), "이동혁".to_string()],
            transfer_tolerance: 500,
            ..Settings::default()
        };
        save_settings(&settings, &path).unwrap();
        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.roster().names().len(), 2);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"known_members": ["박진복"]}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.transfer_tolerance, 100);
        assert_eq!(s.accounts.secondary.description, "신한은행 (폐쇄)");
        assert!(s.roster().contains("박진복"));
    }

    #[test]
    fn test_partial_accounts_block() {
        let json = r#"{"accounts": {"primary": {"account_number": "3333-00", "description": "main"}}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.accounts.primary.account_number.as_deref(), Some("3333-00"));
        assert_eq!(s.accounts.safe_box.description, "안전 자산 운용");
    }

    #[test]
    fn test_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_settings_from(&dir.path().join("missing.json")).is_err());
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(load_settings_from(&bad), Err(DuesError::Settings(_))));
    }
}
