use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(Error::Validation(format!("theme must be light or dark, got '{}'", other))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Theme and credential kept in a small JSON file. Read at startup, written
/// on every change.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
}

impl PreferenceStore {
    /// Load from `path`; a missing file yields defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file, using defaults");
                Preferences::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, current })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &Preferences {
        &self.current
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.current.theme = theme;
        self.save()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.current.theme.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::Validation("API key cannot be empty".to_string()));
        }
        self.current.api_key = Some(api_key.to_string());
        self.save()
    }

    pub fn clear_api_key(&mut self) -> Result<()> {
        self.current.api_key = None;
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.current)?)?;
        info!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("topic-tutor-{}-{}", name, uuid::Uuid::new_v4()))
            .join("prefs.json")
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = PreferenceStore::open(temp_path("missing")).unwrap();
        assert_eq!(store.get().theme, Theme::Light);
        assert!(store.get().api_key.is_none());
    }

    #[test]
    fn test_changes_survive_reopen() {
        let path = temp_path("persist");
        let mut store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        store.set_api_key("  secret-key ").unwrap();

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get().theme, Theme::Dark);
        assert_eq!(reopened.get().api_key.as_deref(), Some("secret-key"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_rejects_blank_key_and_bad_theme() {
        let mut store = PreferenceStore::open(temp_path("blank")).unwrap();
        assert!(store.set_api_key("   ").is_err());
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(PreferenceStore::open(&path), Err(Error::PreferencesFormat(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
