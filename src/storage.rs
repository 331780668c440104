//! Persistent mistake and history stores.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreResult;
use crate::history::{summarize, CourseSummary};
use crate::mistakes::MistakeRecord;
use crate::report::SessionRecord;

pub const MISTAKES_KEY: &str = "pinyin_mistakes_v2";
pub const HISTORY_KEY: &str = "pinyin_history_v2";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Mistakes kept across sessions, at most one per question.
pub trait MistakeStore {
    fn load_mistakes(&self) -> Vec<MistakeRecord>;
    /// Adds the record unless its question is already stored.
    fn save_mistake(&mut self, record: &MistakeRecord) -> StoreResult<()>;
    fn remove_mistake(&mut self, question: &str) -> StoreResult<()>;
    fn clear_mistakes(&mut self) -> StoreResult<()>;
}

/// Completed sessions, newest first.
pub trait HistoryStore {
    fn load_history(&self) -> Vec<SessionRecord>;
    fn save_session_record(&mut self, record: &SessionRecord) -> StoreResult<()>;

    /// Per-course totals over the stored history.
    fn summary_by_course(&self) -> Vec<CourseSummary> {
        summarize(&self.load_history())
    }
}

fn add_mistake(list: &mut Vec<MistakeRecord>, record: &MistakeRecord) -> bool {
    if list.iter().any(|m| m.question == record.question) {
        return false;
    }
    list.push(record.clone());
    true
}

fn push_history(list: &mut Vec<SessionRecord>, record: &SessionRecord, limit: usize) {
    list.insert(0, record.clone());
    list.truncate(limit);
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
    history_limit: usize,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// A missing blob is empty. A blob that can't be read or parsed is logged
    /// and treated as empty too.
    fn read_blob<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(target: "pinyin_match", path = %path.display(), error = %e, "failed to read store");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(e) => {
                warn!(target: "pinyin_match", path = %path.display(), error = %e, "corrupt store, ignoring");
                Vec::new()
            }
        }
    }

    fn write_blob<T: Serialize>(&self, key: &str, items: &[T]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec(items)?;
        fs::write(self.path_for(key), data)?;
        Ok(())
    }
}

impl MistakeStore for JsonStore {
    fn load_mistakes(&self) -> Vec<MistakeRecord> {
        self.read_blob(MISTAKES_KEY)
    }

    fn save_mistake(&mut self, record: &MistakeRecord) -> StoreResult<()> {
        let mut mistakes = self.load_mistakes();
        if add_mistake(&mut mistakes, record) {
            self.write_blob(MISTAKES_KEY, &mistakes)?;
        }
        Ok(())
    }

    fn remove_mistake(&mut self, question: &str) -> StoreResult<()> {
        let mut mistakes = self.load_mistakes();
        let before = mistakes.len();
        mistakes.retain(|m| m.question != question);
        if mistakes.len() != before {
            self.write_blob(MISTAKES_KEY, &mistakes)?;
        }
        Ok(())
    }

    fn clear_mistakes(&mut self) -> StoreResult<()> {
        match fs::remove_file(self.path_for(MISTAKES_KEY)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl HistoryStore for JsonStore {
    fn load_history(&self) -> Vec<SessionRecord> {
        self.read_blob(HISTORY_KEY)
    }

    fn save_session_record(&mut self, record: &SessionRecord) -> StoreResult<()> {
        let mut history = self.load_history();
        push_history(&mut history, record, self.history_limit);
        self.write_blob(HISTORY_KEY, &history)
    }
}

/// In-process store, handy for tests and throwaway sessions.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    mistakes: Vec<MistakeRecord>,
    history: Vec<SessionRecord>,
    history_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            mistakes: Vec::new(),
            history: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mistakes(mut self, mistakes: Vec<MistakeRecord>) -> Self {
        for m in &mistakes {
            add_mistake(&mut self.mistakes, m);
        }
        self
    }
}

impl MistakeStore for MemoryStore {
    fn load_mistakes(&self) -> Vec<MistakeRecord> {
        self.mistakes.clone()
    }

    fn save_mistake(&mut self, record: &MistakeRecord) -> StoreResult<()> {
        add_mistake(&mut self.mistakes, record);
        Ok(())
    }

    fn remove_mistake(&mut self, question: &str) -> StoreResult<()> {
        self.mistakes.retain(|m| m.question != question);
        Ok(())
    }

    fn clear_mistakes(&mut self) -> StoreResult<()> {
        self.mistakes.clear();
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn load_history(&self) -> Vec<SessionRecord> {
        self.history.clone()
    }

    fn save_session_record(&mut self, record: &SessionRecord) -> StoreResult<()> {
        push_history(&mut self.history, record, self.history_limit);
        Ok(())
    }
}
