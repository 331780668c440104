use std::path::Path;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use rusqlite::{params, Connection, Result};
use tracing::warn;

use crate::error::StoreResult;
use crate::mistakes::MistakeRecord;
use crate::report::SessionRecord;
use crate::storage::{HistoryStore, DEFAULT_HISTORY_LIMIT};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS session_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        course_title TEXT NOT NULL,
        start_ms INTEGER NOT NULL,
        end_ms INTEGER NOT NULL,
        duration_ms INTEGER NOT NULL,
        total_items INTEGER NOT NULL,
        mistake_count INTEGER NOT NULL,
        mistakes TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Per-course aggregate over stored sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub course_title: String,
    pub sessions: i64,
    pub avg_accuracy: f64,
    pub total_duration_ms: i64,
}

/// Session history in SQLite, newest first, capped like the JSON store.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
    limit: usize,
}

impl HistoryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_history_course ON session_history(course_title)",
            [],
        )?;
        Ok(HistoryDb {
            conn,
            limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Insert a record and drop everything beyond the newest `limit` rows.
    pub fn insert(&mut self, record: &SessionRecord) -> StoreResult<()> {
        let mistakes = serde_json::to_string(&record.mistakes)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO session_history
            (id, course_title, start_ms, end_ms, duration_ms, total_items, mistake_count, mistakes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.course_title,
                record.start_time.timestamp_millis(),
                record.end_time.timestamp_millis(),
                record.duration as i64,
                record.total_items as i64,
                record.mistakes.len() as i64,
                mistakes,
            ],
        )?;
        tx.execute(
            r#"
            DELETE FROM session_history WHERE seq NOT IN (
                SELECT seq FROM session_history ORDER BY seq DESC LIMIT ?1
            )
            "#,
            params![self.limit as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn records(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, course_title, start_ms, end_ms, duration_ms, total_items, mistakes
            FROM session_history
            ORDER BY seq DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let mistakes_json: String = row.get(6)?;
            let mistakes: Vec<MistakeRecord> =
                serde_json::from_str(&mistakes_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        6,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(SessionRecord {
                id: row.get(0)?,
                course_title: row.get(1)?,
                start_time: millis_to_utc(row.get(2)?, 2)?,
                end_time: millis_to_utc(row.get(3)?, 3)?,
                duration: row.get::<_, i64>(4)?.max(0) as u64,
                total_items: row.get::<_, i64>(5)?.max(0) as usize,
                mistakes,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn course_summary(&self) -> Result<Vec<CourseSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                course_title,
                COUNT(*) as sessions,
                AVG(CASE WHEN total_items = 0 THEN 100.0
                    ELSE MAX(0.0, (total_items - mistake_count) * 100.0 / total_items) END) as avg_accuracy,
                SUM(duration_ms) as total_duration
            FROM session_history
            GROUP BY course_title
            ORDER BY course_title
            "#,
        )?;

        let summary = stmt.query_map([], |row| {
            Ok(CourseSummary {
                course_title: row.get(0)?,
                sessions: row.get(1)?,
                avg_accuracy: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                total_duration_ms: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            })
        })?;

        let mut out = Vec::new();
        for item in summary {
            out.push(item?);
        }
        Ok(out)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_history", [])?;
        Ok(())
    }
}

fn millis_to_utc(ms: i64, column: usize) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(column, "timestamp".to_string(), rusqlite::types::Type::Integer)
    })
}

/// Per-course aggregate over records already in memory, ordered by title.
/// Agrees with [`HistoryDb::course_summary`].
pub fn summarize(records: &[SessionRecord]) -> Vec<CourseSummary> {
    records
        .iter()
        .sorted_by(|a, b| a.course_title.cmp(&b.course_title))
        .chunk_by(|r| r.course_title.clone())
        .into_iter()
        .map(|(course_title, group)| {
            let group: Vec<&SessionRecord> = group.collect();
            let accuracy_sum: f64 = group.iter().map(|r| session_accuracy(r)).sum();
            CourseSummary {
                course_title,
                sessions: group.len() as i64,
                avg_accuracy: accuracy_sum / group.len() as f64,
                total_duration_ms: group.iter().map(|r| r.duration as i64).sum(),
            }
        })
        .collect()
}

/// Unrounded accuracy, as the summary query computes it.
fn session_accuracy(record: &SessionRecord) -> f64 {
    if record.total_items == 0 {
        return 100.0;
    }
    let total = record.total_items as f64;
    ((total - record.mistakes.len() as f64) * 100.0 / total).max(0.0)
}

impl HistoryStore for HistoryDb {
    fn load_history(&self) -> Vec<SessionRecord> {
        self.records().unwrap_or_else(|e| {
            warn!(target: "pinyin_match", error = %e, "failed to read history database");
            Vec::new()
        })
    }

    fn save_session_record(&mut self, record: &SessionRecord) -> StoreResult<()> {
        self.insert(record)
    }

    fn summary_by_course(&self) -> Vec<CourseSummary> {
        self.course_summary().unwrap_or_else(|e| {
            warn!(target: "pinyin_match", error = %e, "failed to summarize history database");
            Vec::new()
        })
    }
}
