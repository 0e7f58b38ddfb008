// Configuration management for songshelf
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "songshelf";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub library: LibraryConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

/// Where the catalog lives on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub metadata_file: PathBuf,
    pub playlist_file: PathBuf,
    pub audio_dir: PathBuf,
    pub image_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub end_of_list: EndOfList,
    pub volume: f32,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
}

/// What `skip` does past the last entry of a playlist or queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfList {
    #[default]
    Stop,
    Wrap,
}

impl LibraryConfig {
    /// All four resources under one directory, using the classic file names
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            metadata_file: root.join("data.txt"),
            playlist_file: root.join("playlists.txt"),
            audio_dir: root.join("Audios"),
            image_dir: root.join("images"),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            end_of_list: EndOfList::Stop,
            volume: 0.7,
            poll_interval_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_root = data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            library: LibraryConfig::rooted_at(&data_root),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig {
                log_dir: data_root.join("logs"),
            },
        }
    }
}

impl Config {
    /// Load from the per-user config file, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }
}
