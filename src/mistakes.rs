//! Mistake records and the per-session accumulators.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::challenge::{ChallengeKind, FillChallenge, MatchChallenge, QuizChallenge};
use crate::item::{FillItem, Item, Pair, Term};
use crate::options::MAX_DISTRACTORS;

fn default_level() -> u32 {
    1
}

/// A question the learner got wrong, in the shape it is persisted.
///
/// `options` holds distractors for quiz and match records and the whole
/// option pool for fill records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChallengeKind>,
    #[serde(alias = "word")]
    pub question: String,
    #[serde(alias = "pinyin")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub options: Vec<String>,
}

impl MistakeRecord {
    pub fn from_quiz(challenge: &QuizChallenge) -> Self {
        Self {
            kind: Some(ChallengeKind::Quiz),
            question: challenge.question.clone(),
            answer: challenge.answer.clone(),
            answers: None,
            level: challenge.level,
            options: challenge.distractors(),
        }
    }

    /// Match pairs carry no distractors of their own, so the other pairs'
    /// answers stand in for them.
    pub fn from_pair(pair: &Pair, challenge: &MatchChallenge) -> Self {
        let options = challenge
            .pairs
            .iter()
            .filter(|p| p.answer != pair.answer)
            .map(|p| p.answer.clone())
            .take(MAX_DISTRACTORS)
            .collect();
        Self {
            kind: Some(ChallengeKind::Match),
            question: pair.question.clone(),
            answer: pair.answer.clone(),
            answers: None,
            level: pair.level,
            options,
        }
    }

    pub fn from_fill(challenge: &FillChallenge) -> Self {
        Self {
            kind: Some(ChallengeKind::Fill),
            question: challenge.question.clone(),
            answer: challenge.answers.join(" "),
            answers: Some(challenge.answers.clone()),
            level: challenge.level,
            options: challenge.options.clone(),
        }
    }

    /// Records made from catalog terms, used to pad short review sessions.
    pub fn from_term(term: &Term) -> Self {
        Self {
            kind: None,
            question: term.question.clone(),
            answer: term.answer.clone(),
            answers: None,
            level: term.level,
            options: term.options.clone(),
        }
    }

    pub fn is_fill(&self) -> bool {
        self.kind == Some(ChallengeKind::Fill)
    }

    /// Turn the record back into a source item for replay.
    pub fn to_item(&self) -> Item {
        match (&self.answers, self.is_fill()) {
            (Some(answers), true) => Item::Fill(FillItem {
                question: self.question.clone(),
                answers: answers.clone(),
                options: self.options.clone(),
                level: self.level,
            }),
            _ => Item::Default(
                Term::new(self.question.clone(), self.answer.clone(), self.level)
                    .with_options(self.options.iter().cloned()),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordOutcome {
    pub new_in_pass: bool,
    pub new_in_session: bool,
}

/// Two accumulators: one for the current pass and one for the whole session.
///
/// Both hold at most one record per question.
#[derive(Debug, Clone, Default)]
pub struct MistakeTracker {
    pass: Vec<MistakeRecord>,
    session: Vec<MistakeRecord>,
}

impl MistakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: MistakeRecord) -> RecordOutcome {
        let new_in_session = push_unique(&mut self.session, &record);
        let new_in_pass = push_unique(&mut self.pass, &record);
        debug!(
            target: "pinyin_match",
            question = %record.question,
            new_in_pass,
            new_in_session,
            "mistake recorded"
        );
        RecordOutcome {
            new_in_pass,
            new_in_session,
        }
    }

    /// Mistakes of the current pass.
    pub fn session_mistakes(&self) -> &[MistakeRecord] {
        &self.pass
    }

    /// Every mistake since the session started.
    pub fn all_mistakes(&self) -> &[MistakeRecord] {
        &self.session
    }

    /// Drain the current pass, leaving the session accumulator untouched.
    pub fn take_session(&mut self) -> Vec<MistakeRecord> {
        std::mem::take(&mut self.pass)
    }

    pub fn reset(&mut self) {
        self.pass.clear();
        self.session.clear();
    }
}

fn push_unique(list: &mut Vec<MistakeRecord>, record: &MistakeRecord) -> bool {
    if list.iter().any(|m| m.question == record.question) {
        return false;
    }
    list.push(record.clone());
    true
}
