//! Session records and their textual report.

use std::fmt::Write as _;
use std::io;

use chrono::{DateTime, Local, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::StoreResult;
use crate::mistakes::MistakeRecord;

/// Summary of one completed play-through, as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub course_title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    /// Milliseconds.
    pub duration: u64,
    pub total_items: usize,
    pub mistakes: Vec<MistakeRecord>,
}

impl SessionRecord {
    /// Percentage of questions answered without a mistake, rounded.
    pub fn accuracy(&self) -> u32 {
        if self.total_items == 0 {
            return 100;
        }
        let correct = self.total_items.saturating_sub(self.mistakes.len()) as f64;
        (correct / self.total_items as f64 * 100.0).round() as u32
    }

    pub fn grade(&self) -> Grade {
        Grade::from_accuracy(self.accuracy())
    }

    /// Mistakes with duplicate questions dropped, first occurrence wins.
    pub fn unique_mistakes(&self) -> Vec<&MistakeRecord> {
        self.mistakes
            .iter()
            .unique_by(|m| m.question.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Grade {
    #[strum(to_string = "优秀")]
    Excellent,
    #[strum(to_string = "良好")]
    Fair,
    #[strum(to_string = "加油")]
    NeedsWork,
}

impl Grade {
    pub fn from_accuracy(accuracy: u32) -> Self {
        match accuracy {
            90.. => Grade::Excellent,
            60..=89 => Grade::Fair,
            _ => Grade::NeedsWork,
        }
    }
}

/// `"2分 5秒"` style duration.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}分 {}秒", seconds / 60, seconds % 60)
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%m-%d %H:%M").to_string()
}

/// Full report for a single session.
pub fn render_report(record: &SessionRecord) -> String {
    let mistakes = record.unique_mistakes();
    let mut out = String::new();
    let _ = writeln!(out, "学习报告 · {}", record.course_title);
    let _ = writeln!(out, "准确率 {}% ({})", record.accuracy(), record.grade());
    let _ = writeln!(
        out,
        "总题数 {}  错题 {}  耗时 {}",
        record.total_items,
        mistakes.len(),
        format_duration(record.duration)
    );
    let _ = writeln!(
        out,
        "开始: {}  结束: {}",
        format_time(&record.start_time),
        format_time(&record.end_time)
    );
    if mistakes.is_empty() {
        let _ = writeln!(out, "完美通关!");
    } else {
        let _ = writeln!(out, "需加强 ({})", mistakes.len());
        for m in mistakes {
            let _ = writeln!(out, "  {} {}  Lv.{}", m.question, m.answer, m.level);
        }
    }
    out
}

/// One line per record for history listings.
pub fn history_line(record: &SessionRecord) -> String {
    let mut line = format!(
        "{} · {} · {}秒 · {}%",
        record.course_title,
        format_time(&record.start_time),
        (record.duration as f64 / 1000.0).round() as u64,
        record.accuracy()
    );
    if !record.mistakes.is_empty() {
        line.push_str(&format!(" · {} 个错误", record.mistakes.len()));
    }
    line
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    course: &'a str,
    start: String,
    end: String,
    duration_secs: f64,
    total_items: usize,
    mistakes: usize,
    accuracy: u32,
    missed: String,
}

/// Write history as CSV, one row per session.
pub fn write_history_csv<W: io::Write>(records: &[SessionRecord], writer: W) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(CsvRow {
            id: &r.id,
            course: &r.course_title,
            start: r.start_time.to_rfc3339(),
            end: r.end_time.to_rfc3339(),
            duration_secs: r.duration as f64 / 1000.0,
            total_items: r.total_items,
            mistakes: r.mistakes.len(),
            accuracy: r.accuracy(),
            missed: r.unique_mistakes().iter().map(|m| m.question.as_str()).join(" "),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Term;
    use chrono::TimeZone;

    fn record(total: usize, mistakes: &[&str]) -> SessionRecord {
        SessionRecord {
            id: "session-1".into(),
            course_title: "第一单元".into(),
            start_time: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            end_time: Utc.timestamp_millis_opt(1_700_000_125_000).unwrap(),
            duration: 125_000,
            total_items: total,
            mistakes: mistakes
                .iter()
                .map(|q| MistakeRecord::from_term(&Term::new(*q, "x", 1)))
                .collect(),
        }
    }

    #[test]
    fn test_accuracy_rounds() {
        assert_eq!(record(3, &["八"]).accuracy(), 67);
        assert_eq!(record(4, &[]).accuracy(), 100);
        assert_eq!(record(0, &[]).accuracy(), 100);
    }

    #[test]
    fn test_accuracy_never_negative() {
        assert_eq!(record(1, &["八", "爬"]).accuracy(), 0);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_accuracy(90), Grade::Excellent);
        assert_eq!(Grade::from_accuracy(60), Grade::Fair);
        assert_eq!(Grade::from_accuracy(59), Grade::NeedsWork);
    }

    #[test]
    fn test_unique_mistakes() {
        let r = record(5, &["八", "爬", "八"]);
        let qs: Vec<&str> = r.unique_mistakes().iter().map(|m| m.question.as_str()).collect();
        assert_eq!(qs, vec!["八", "爬"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(125_000), "2分 5秒");
        assert_eq!(format_duration(999), "0分 0秒");
    }

    #[test]
    fn test_record_serializes_camel_case_millis() {
        let json = serde_json::to_value(record(1, &[])).unwrap();
        assert_eq!(json["courseTitle"], "第一单元");
        assert_eq!(json["startTime"], 1_700_000_000_000i64);
        assert_eq!(json["totalItems"], 1);
    }

    #[test]
    fn test_report_lists_mistakes() {
        let text = render_report(&record(4, &["八"]));
        assert!(text.contains("准确率 75%"));
        assert!(text.contains("需加强 (1)"));
        assert!(text.contains("八"));
        assert!(render_report(&record(4, &[])).contains("完美通关"));
    }

    #[test]
    fn test_csv_export() {
        let mut buf = Vec::new();
        write_history_csv(&[record(4, &["八"])], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,course,start,end"));
        let row = lines.next().unwrap();
        assert!(row.contains("第一单元"));
        assert!(row.ends_with(",75,八"));
    }
}
