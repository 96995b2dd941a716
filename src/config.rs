use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::weather::OPEN_WEATHER_API_BASE;

pub const DEFAULT_CONFIG_FILE: &str = "city-wx.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub preferences_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: OPEN_WEATHER_API_BASE.to_string(),
            preferences_path: None,
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_key: Option<String>,
    api_base: Option<String>,
    preferences_path: Option<PathBuf>,
    log_filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Defaults, then the TOML file, then the process environment.
///
/// Without an explicit path a missing `city-wx.toml` is fine; an explicit
/// path has to exist.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<FileSettings>(&raw)
                .map_err(|source| ConfigError::Parse { path, source })?;
            settings.apply_file(file_cfg);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {}
        Err(source) => return Err(ConfigError::Read { path, source }),
    }

    settings.apply_env(|name| std::env::var(name).ok());
    Ok(settings)
}

impl Settings {
    /// The API key, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file_cfg.api_base {
            self.api_base = v;
        }
        if let Some(v) = file_cfg.preferences_path {
            self.preferences_path = Some(v);
        }
        if let Some(v) = file_cfg.log_filter {
            self.log_filter = v;
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("OPENWEATHER_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("CITY_WX__API_KEY") {
            self.api_key = Some(v);
        }

        if let Some(v) = lookup("CITY_WX__API_BASE") {
            self.api_base = v;
        }

        if let Some(v) = lookup("CITY_WX__PREFERENCES") {
            self.preferences_path = Some(PathBuf::from(v));
        }

        if let Some(v) = lookup("RUST_LOG") {
            self.log_filter = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api_base, "https://api.openweathermap.org");
        assert_eq!(settings.credential(), None);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("city-wx.toml");
        fs::write(
            &path,
            "api_key = \"from-file\"\napi_base = \"http://localhost:8080\"\nlog_filter = \"debug\"\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        let raw = fs::read_to_string(&path).unwrap();
        settings.apply_file(toml::from_str(&raw).unwrap());
        assert_eq!(settings.credential(), Some("from-file"));
        assert_eq!(settings.api_base, "http://localhost:8080");

        settings.apply_env(env(&[
            ("OPENWEATHER_API_KEY", "from-env"),
            ("CITY_WX__PREFERENCES", "/tmp/prefs.json"),
        ]));
        assert_eq!(settings.credential(), Some("from-env"));
        assert_eq!(
            settings.preferences_path.as_deref(),
            Some(Path::new("/tmp/prefs.json"))
        );
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn prefixed_key_wins() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[
            ("OPENWEATHER_API_KEY", "plain"),
            ("CITY_WX__API_KEY", "prefixed"),
        ]));
        assert_eq!(settings.credential(), Some("prefixed"));
    }

    #[test]
    fn blank_key_is_no_credential() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("OPENWEATHER_API_KEY", "  ")]));
        assert_eq!(settings.credential(), None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("city-wx.toml");
        fs::write(&path, "api_key = [unterminated").unwrap();
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file_cfg: FileSettings = toml::from_str("units = \"metric\"\n").unwrap();
        assert!(file_cfg.api_key.is_none());
    }
}
