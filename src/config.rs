use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::exam::{ExamKind, ExamPreset};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub duration_secs: u32,
    pub allow_backspace: bool,
    pub highlight: bool,
    pub last_exam: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            allow_backspace: true,
            highlight: true,
            last_exam: None,
        }
    }
}

impl Config {
    /// The last exam taken, if it still names a known preset.
    pub fn last_exam_kind(&self) -> Option<ExamKind> {
        self.last_exam
            .as_deref()
            .and_then(ExamPreset::by_id)
            .map(|preset| preset.kind)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        writeln!(f, "duration:  {}s", self.duration_secs)?;
        writeln!(f, "backspace: {}", on_off(self.allow_backspace))?;
        writeln!(f, "highlight: {}", on_off(self.highlight))?;
        writeln!(f, "last exam: {}", self.last_exam.as_deref().unwrap_or("none"))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typewise_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) if cfg.duration_secs > 0 => cfg,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
