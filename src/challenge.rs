//! Playable units produced by the generator.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use crate::item::Pair;

/// Marker separating the segments of a fill-in-the-blank template.
pub const BLANK_MARKER: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChallengeId(Uuid);

impl ChallengeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChallengeKind {
    Quiz,
    Match,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizChallenge {
    pub id: ChallengeId,
    pub question: String,
    pub answer: String,
    pub level: u32,
    /// Final, already shuffled option list. Always contains `answer`.
    pub options: Vec<String>,
}

impl QuizChallenge {
    /// Options other than the answer, in display order.
    pub fn distractors(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| **o != self.answer)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchChallenge {
    pub id: ChallengeId,
    pub pairs: Vec<Pair>,
}

impl MatchChallenge {
    /// First pair, in pair order, whose question is `a` or `b`.
    pub fn pair_for(&self, a: &str, b: &str) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.question == a || p.question == b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillChallenge {
    pub id: ChallengeId,
    /// Template text with one `__` per blank.
    pub question: String,
    pub answers: Vec<String>,
    pub level: u32,
    pub options: Vec<String>,
}

impl FillChallenge {
    /// Text around the blanks; there is one more segment than there are markers.
    pub fn segments(&self) -> Vec<&str> {
        self.question.split(BLANK_MARKER).collect()
    }

    pub fn slot_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_solved_by<S: AsRef<str>>(&self, filled: &[S]) -> bool {
        filled.len() == self.answers.len()
            && filled
                .iter()
                .zip(&self.answers)
                .all(|(got, want)| got.as_ref() == want)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Quiz(QuizChallenge),
    Match(MatchChallenge),
    Fill(FillChallenge),
}

impl Challenge {
    pub fn id(&self) -> ChallengeId {
        match self {
            Challenge::Quiz(c) => c.id,
            Challenge::Match(c) => c.id,
            Challenge::Fill(c) => c.id,
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        match self {
            Challenge::Quiz(_) => ChallengeKind::Quiz,
            Challenge::Match(_) => ChallengeKind::Match,
            Challenge::Fill(_) => ChallengeKind::Fill,
        }
    }

    pub fn question_count(&self) -> usize {
        match self {
            Challenge::Match(c) => c.pairs.len(),
            Challenge::Quiz(_) | Challenge::Fill(_) => 1,
        }
    }
}
