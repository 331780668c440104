use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides where mistakes and history are kept.
pub const DATA_DIR_ENV: &str = "PINYIN_MATCH_DATA_DIR";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("pinyin-match")
        } else {
            ProjectDirs::from("", "", "pinyin-match")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".pinyin-match"))
        }
    }

    /// SQLite history file inside `data_dir`.
    pub fn history_db_path(data_dir: &Path) -> PathBuf {
        data_dir.join("history.db")
    }
}
