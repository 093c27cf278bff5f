use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "cropmark";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_AI_MODEL: &str = "gpt-image-1";
pub const DEFAULT_AI_ENDPOINT: &str = "https://api.openai.com/v1/images/edits";
const DEFAULT_HOTKEY: &str = "cmd+shift+2";

/// Read-only settings handed to every overlay session. An empty `api_key` disables AI edits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub capture_cursor: bool,
    pub hotkey: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_AI_MODEL.to_string(),
            endpoint: DEFAULT_AI_ENDPOINT.to_string(),
            capture_cursor: false,
            hotkey: DEFAULT_HOTKEY.to_string(),
        }
    }
}

impl OverlaySettings {
    pub fn ai_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Falls back to the default model when the configured one is blank.
    pub fn model_or_default(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() {
            DEFAULT_AI_MODEL
        } else {
            model
        }
    }

    pub fn endpoint_or_default(&self) -> &str {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            DEFAULT_AI_ENDPOINT
        } else {
            endpoint
        }
    }
}

pub fn load_settings() -> OverlaySettings {
    let (xdg_config_home, home) = config_env_dirs();
    load_settings_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_settings_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> OverlaySettings {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(?err, "no config directory; using default settings");
            return OverlaySettings::default();
        }
    };
    if !path.exists() {
        return OverlaySettings::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_settings(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            OverlaySettings::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            OverlaySettings::default()
        }
    }
}

fn parse_settings(contents: &str) -> Result<OverlaySettings, serde_json::Error> {
    serde_json::from_str(contents)
}

fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "cropmark",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/cropmark/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("cropmark", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/cropmark/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("cropmark", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let settings =
            parse_settings(r#"{ "api_key": "sk-test", "model": "  " }"#).expect("valid json");
        assert!(settings.ai_enabled());
        assert_eq!(settings.model_or_default(), DEFAULT_AI_MODEL);
        assert_eq!(settings.endpoint_or_default(), DEFAULT_AI_ENDPOINT);
        assert!(!settings.capture_cursor);
    }

    #[test]
    fn blank_api_key_disables_ai() {
        let settings = OverlaySettings {
            api_key: "   ".to_string(),
            ..OverlaySettings::default()
        };
        assert!(!settings.ai_enabled());
    }

    #[test]
    fn malformed_config_file_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = temp.path().join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(APP_CONFIG_FILE), "{ not json").unwrap();

        let settings = load_settings_with(Some(temp.path()), None);
        assert_eq!(settings, OverlaySettings::default());
    }

    #[test]
    fn config_file_is_loaded_from_xdg_dir() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = temp.path().join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(APP_CONFIG_FILE),
            r#"{ "api_key": "k", "capture_cursor": true }"#,
        )
        .unwrap();

        let settings = load_settings_with(Some(temp.path()), None);
        assert_eq!(settings.api_key, "k");
        assert!(settings.capture_cursor);
    }
}
