use rand::seq::SliceRandom;
use rand::Rng;
use strum_macros::Display;

use crate::challenge::MatchChallenge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CardSide {
    Question,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CardStatus {
    Idle,
    Selected,
    Matched,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    /// Question of the pair this card belongs to; two cards match when these agree.
    pub question: String,
    pub display: String,
    pub side: CardSide,
    pub status: CardStatus,
}

impl Card {
    /// `index` is the pair's position in its round, so repeated pairs still
    /// get distinct ids.
    fn new(side: CardSide, index: usize, question: &str, answer: &str) -> Self {
        let (prefix, display) = match side {
            CardSide::Question => ("q", question),
            CardSide::Answer => ("a", answer),
        };
        Self {
            id: format!("{prefix}{index}-{question}-{answer}"),
            question: question.to_string(),
            display: display.to_string(),
            side,
            status: CardStatus::Idle,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == CardStatus::Matched
    }
}

/// Lay out the cards for a matching round.
///
/// Both columns are shuffled independently, the question column lands on the
/// left or the right with equal odds, and the result is interleaved row by row
/// so a two-column grid reads left, right, left, right.
pub fn deal_cards<R: Rng + ?Sized>(challenge: &MatchChallenge, rng: &mut R) -> Vec<Card> {
    let mut questions: Vec<Card> = challenge
        .pairs
        .iter()
        .enumerate()
        .map(|(i, p)| Card::new(CardSide::Question, i, &p.question, &p.answer))
        .collect();
    let mut answers: Vec<Card> = challenge
        .pairs
        .iter()
        .enumerate()
        .map(|(i, p)| Card::new(CardSide::Answer, i, &p.question, &p.answer))
        .collect();
    questions.shuffle(rng);
    answers.shuffle(rng);

    let (left, right) = if rng.gen_bool(0.5) {
        (questions, answers)
    } else {
        (answers, questions)
    };

    left.into_iter()
        .zip(right)
        .flat_map(|(l, r)| [l, r])
        .collect()
}
