//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\syncplayer\config.toml
//! - macOS: ~/Library/Application Support/syncplayer/config.toml
//! - Linux: ~/.config/syncplayer/config.toml
//!
//! A missing or unreadable file is not an error; defaults are used and
//! the problem is logged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Playback settings
    pub playback: PlaybackConfig,

    /// Album art settings
    pub art: ArtConfig,
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Start playing as soon as duration metadata arrives
    pub autoplay: bool,

    /// Volume for a new player (0.0 - 1.0)
    pub initial_volume: f64,

    /// MIME hints a file may declare; files without a hint are always tried
    pub accepted_mime_types: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            initial_volume: 1.0,
            accepted_mime_types: vec![
                "audio/mpeg".to_string(),
                "audio/mp3".to_string(),
                "audio/wav".to_string(),
                "audio/x-wav".to_string(),
                "audio/ogg".to_string(),
            ],
        }
    }
}

impl PlaybackConfig {
    /// Whether a declared MIME hint is acceptable.
    ///
    /// Parameters such as `; codecs=...` are ignored and matching is
    /// case-insensitive.
    pub fn accepts(&self, mime_hint: Option<&str>) -> bool {
        let Some(hint) = mime_hint else {
            return true;
        };
        let essence = hint.split(';').next().unwrap_or_default().trim();
        self.accepted_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(essence))
    }
}

/// Album art settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtConfig {
    /// Scan files for embedded pictures at all
    pub enabled: bool,

    /// Use the front-cover picture even when another picture comes first
    pub prefer_front_cover: bool,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_front_cover: true,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("syncplayer"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// Returns default config if file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file.
///
/// Creates the parent directory if needed and writes atomically
/// (temp file, then rename).
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Save configuration on a blocking thread.
pub async fn save_async(config: Config, path: PathBuf) -> Result<(), ConfigError> {
    tokio::task::spawn_blocking(move || save_to(&config, &path))
        .await
        .map_err(|e| ConfigError::TaskJoin(e.to_string()))?
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[playback]"));
        assert!(toml.contains("[art]"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[playback]
autoplay = false
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert!(!config.playback.autoplay);
        assert_eq!(config.playback.initial_volume, 1.0);
        assert!(config.playback.accepts(Some("audio/mpeg")));
        assert!(config.art.enabled);
    }

    #[test]
    fn test_accepts_mime_hints() {
        let playback = PlaybackConfig::default();
        assert!(playback.accepts(None));
        assert!(playback.accepts(Some("audio/mp3")));
        assert!(playback.accepts(Some("Audio/OGG; codecs=vorbis")));
        assert!(!playback.accepts(Some("video/mp4")));
        assert!(!playback.accepts(Some("")));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.playback.initial_volume = 0.25;
        config.art.prefer_front_cover = false;
        save_to(&config, &path).unwrap();

        let loaded = load_from(&path);
        assert_eq!(loaded.playback.initial_volume, 0.25);
        assert!(!loaded.art.prefer_front_cover);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let config = load_from(&path);
        assert!(config.playback.autoplay);
    }

    #[tokio::test]
    async fn test_save_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_async(Config::default(), path.clone()).await.unwrap();
        assert!(path.exists());
    }
}
