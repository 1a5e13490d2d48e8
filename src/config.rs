//! Configuration loading and management
//!
//! Runtime paths derive from `$HOME`. Everything else comes from an
//! optional TOML file; missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::speech::CaptureConfig;
use crate::state::Timeouts;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "AVATAR_CHAT_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the Unix domain socket for the UI shell
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Directory holding `<key>.mp4` clips
    pub video_dir: PathBuf,

    /// Simulated length of one-shot clips
    pub clip_length: Duration,

    pub speech: SpeechConfig,

    pub watchdog: WatchdogConfig,
}

/// Which capture engine to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Typed utterances on stdin
    #[default]
    Stdin,
    /// No speech capability on this host
    None,
}

/// `[speech]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: EngineKind,
    #[serde(flatten)]
    pub capture: CaptureConfig,
}

/// `[watchdog]` section; zero disables a limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub listen_timeout_secs: u64,
    pub clip_timeout_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            listen_timeout_secs: 20,
            clip_timeout_secs: 60,
        }
    }
}

impl WatchdogConfig {
    pub fn timeouts(&self) -> Timeouts {
        let limit = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Timeouts {
            listen: limit(self.listen_timeout_secs),
            clip: limit(self.clip_timeout_secs),
        }
    }
}

/// On-disk file layout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    video_dir: Option<PathBuf>,
    clip_length_ms: Option<u64>,
    speech: SpeechConfig,
    watchdog: WatchdogConfig,
}

impl Config {
    /// Load configuration from environment, config file and defaults
    pub fn load() -> Result<Self> {
        let home = PathBuf::from(std::env::var("HOME")?);
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => home.join(".config").join("avatar-chat").join("config.toml"),
        };

        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))?
        } else {
            FileConfig::default()
        };

        Ok(Self::resolve(&home, file))
    }

    fn parse(content: &str) -> Result<FileConfig> {
        Ok(toml::from_str(content)?)
    }

    fn resolve(home: &Path, file: FileConfig) -> Self {
        let data_dir = file.data_dir.unwrap_or_else(|| {
            home.join(".local").join("share").join("avatar-chat")
        });
        let socket_path = file.socket_path.unwrap_or_else(|| data_dir.join("daemon.sock"));
        let video_dir = file.video_dir.unwrap_or_else(|| data_dir.join("videos"));

        Self {
            socket_path,
            data_dir,
            video_dir,
            clip_length: Duration::from_millis(file.clip_length_ms.unwrap_or(4_000)),
            speech: file.speech,
            watchdog: file.watchdog,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
