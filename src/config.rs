use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::Display;

use crate::engine::{EngineOptions, Pacing};
use crate::generator::{GeneratorConfig, DEFAULT_QUIZ_PROBABILITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Items drawn from a course too large to play in full.
    pub session_size: usize,
    /// Courses up to this size are played in full.
    pub full_course_limit: usize,
    pub quiz_probability: f64,
    pub mistake_session_size: usize,
    /// Below this many stored mistakes a review session is padded from the common pool.
    pub mistake_min_threshold: usize,
    pub history_limit: usize,
    pub history_backend: HistoryBackend,
    pub pacing: Pacing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_size: 20,
            full_course_limit: 40,
            quiz_probability: DEFAULT_QUIZ_PROBABILITY,
            mistake_session_size: 10,
            mistake_min_threshold: 5,
            history_limit: 100,
            history_backend: HistoryBackend::Json,
            pacing: Pacing::default(),
        }
    }
}

impl Config {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            generator: GeneratorConfig {
                quiz_probability: self.quiz_probability,
            },
            pacing: self.pacing,
        }
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
        let path = if let Some(pd) = ProjectDirs::from("", "", "pinyin-match") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("pinyin_match_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
