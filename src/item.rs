//! Source records as authored in course files.
//!
//! Items come in four shapes. The untagged shape is a real variant of its own
//! (`Item::Default`): the generator decides whether it becomes a quiz or part of
//! a matching round. Older data used `word`/`pinyin` for the question and answer
//! fields; both spellings are accepted when loading.

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_level() -> u32 {
    1
}

/// A question/answer pair without distractors, as used inside match groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    #[serde(alias = "word")]
    pub question: String,
    #[serde(alias = "pinyin")]
    pub answer: String,
    #[serde(default = "default_level")]
    pub level: u32,
}

impl Pair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, level: u32) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            level,
        }
    }
}

/// A single question with its answer and optional wrong-answer candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(alias = "word")]
    pub question: String,
    #[serde(alias = "pinyin")]
    pub answer: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Term {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, level: u32) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            level,
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_pair(&self) -> Pair {
        Pair::new(self.question.clone(), self.answer.clone(), self.level)
    }
}

/// An author-curated matching round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroup {
    pub items: Vec<Pair>,
}

/// A sentence template with `__` blank markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillItem {
    pub question: String,
    pub answers: Vec<String>,
    pub options: Vec<String>,
    #[serde(default = "default_level")]
    pub level: u32,
}

/// Item tag as written in course files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTag {
    Default,
    Quiz,
    Match,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawItem", into = "RawItem")]
pub enum Item {
    Default(Term),
    Quiz(Term),
    Match(MatchGroup),
    Fill(FillItem),
}

impl Item {
    pub fn tag(&self) -> ItemTag {
        match self {
            Item::Default(_) => ItemTag::Default,
            Item::Quiz(_) => ItemTag::Quiz,
            Item::Match(_) => ItemTag::Match,
            Item::Fill(_) => ItemTag::Fill,
        }
    }

    /// How many distinct questions this item puts in front of the learner.
    pub fn question_count(&self) -> usize {
        match self {
            Item::Match(group) => group.items.len(),
            Item::Default(_) | Item::Quiz(_) | Item::Fill(_) => 1,
        }
    }

    /// The plain term behind default and quiz items.
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Item::Default(term) | Item::Quiz(term) => Some(term),
            Item::Match(_) | Item::Fill(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("unknown item type `{0}`")]
    UnknownType(String),
    #[error("{0} item is missing `{1}`")]
    MissingField(&'static str, &'static str),
}

/// Flat on-disk shape shared by every variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawItem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, alias = "word", skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    #[serde(default, alias = "pinyin", skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<Pair>,
}

impl RawItem {
    fn into_term(self, kind: &'static str) -> Result<Term, ItemError> {
        Ok(Term {
            question: self
                .question
                .ok_or(ItemError::MissingField(kind, "question"))?,
            answer: self.answer.ok_or(ItemError::MissingField(kind, "answer"))?,
            level: self.level.unwrap_or_else(default_level),
            options: self.options,
        })
    }
}

impl TryFrom<RawItem> for Item {
    type Error = ItemError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let tag = raw.kind.as_deref().map(str::to_ascii_uppercase);
        match tag.as_deref() {
            None => raw.into_term("default").map(Item::Default),
            Some("QUIZ") => raw.into_term("quiz").map(Item::Quiz),
            Some("MATCH") => {
                if raw.items.is_empty() {
                    return Err(ItemError::MissingField("match", "items"));
                }
                Ok(Item::Match(MatchGroup { items: raw.items }))
            }
            Some("FILL") => {
                let question = raw.question.ok_or(ItemError::MissingField("fill", "question"))?;
                if raw.answers.is_empty() {
                    return Err(ItemError::MissingField("fill", "answers"));
                }
                Ok(Item::Fill(FillItem {
                    question,
                    answers: raw.answers,
                    options: raw.options,
                    level: raw.level.unwrap_or_else(default_level),
                }))
            }
            Some(other) => Err(ItemError::UnknownType(other.to_string())),
        }
    }
}

impl From<Item> for RawItem {
    fn from(item: Item) -> Self {
        match item {
            Item::Default(term) => RawItem {
                question: Some(term.question),
                answer: Some(term.answer),
                level: Some(term.level),
                options: term.options,
                ..RawItem::default()
            },
            Item::Quiz(term) => RawItem {
                kind: Some("QUIZ".into()),
                question: Some(term.question),
                answer: Some(term.answer),
                level: Some(term.level),
                options: term.options,
                ..RawItem::default()
            },
            Item::Match(group) => RawItem {
                kind: Some("MATCH".into()),
                items: group.items,
                ..RawItem::default()
            },
            Item::Fill(fill) => RawItem {
                kind: Some("FILL".into()),
                question: Some(fill.question),
                answers: fill.answers,
                options: fill.options,
                level: Some(fill.level),
                ..RawItem::default()
            },
        }
    }
}
