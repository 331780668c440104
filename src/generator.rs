//! Turns course items into a queue of playable challenges.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::challenge::{Challenge, ChallengeId, FillChallenge, MatchChallenge, QuizChallenge};
use crate::item::{Item, Term};
use crate::mistakes::MistakeRecord;
use crate::options::build_options;

/// Pairs per matching round.
pub const CHUNK_SIZE: usize = 4;
/// A default item needs this many distractors before it may become a quiz.
pub const MIN_QUIZ_DISTRACTORS: usize = 3;
pub const DEFAULT_QUIZ_PROBABILITY: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    /// Chance that a full chunk of quiz-capable items is played as quizzes.
    pub quiz_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            quiz_probability: DEFAULT_QUIZ_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChallengeGenerator {
    config: GeneratorConfig,
}

impl ChallengeGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: Rng + ?Sized>(&self, items: &[Item], rng: &mut R) -> Vec<Challenge> {
        let mut queue = Vec::with_capacity(items.len());
        let mut defaults = Vec::new();

        for item in items {
            match item {
                Item::Quiz(term) => queue.push(quiz(term, rng)),
                Item::Match(group) if group.items.is_empty() => {
                    debug!(target: "pinyin_match", "skipping empty match group");
                }
                Item::Match(group) => queue.push(Challenge::Match(MatchChallenge {
                    id: ChallengeId::new(),
                    pairs: group.items.clone(),
                })),
                Item::Fill(fill) => queue.push(Challenge::Fill(FillChallenge {
                    id: ChallengeId::new(),
                    question: fill.question.clone(),
                    answers: fill.answers.clone(),
                    level: fill.level,
                    options: fill.options.clone(),
                })),
                Item::Default(term) => defaults.push(term.clone()),
            }
        }

        defaults.shuffle(rng);
        let probability = self.config.quiz_probability.clamp(0.0, 1.0);
        for chunk in pack_unique(defaults) {
            let quiz_capable = chunk
                .iter()
                .all(|t| t.options.len() >= MIN_QUIZ_DISTRACTORS);
            let as_quizzes = if chunk.len() == CHUNK_SIZE {
                quiz_capable && rng.gen_bool(probability)
            } else {
                quiz_capable
            };

            if as_quizzes {
                queue.extend(chunk.iter().map(|term| quiz(term, rng)));
            } else {
                queue.push(Challenge::Match(MatchChallenge {
                    id: ChallengeId::new(),
                    pairs: chunk.iter().map(Term::to_pair).collect(),
                }));
            }
        }

        queue.shuffle(rng);
        debug!(
            target: "pinyin_match",
            items = items.len(),
            challenges = queue.len(),
            "generated challenge queue"
        );
        queue
    }

    /// Rebuild a queue from recorded mistakes for a retry pass or a review session.
    pub fn generate_from_mistakes<R: Rng + ?Sized>(
        &self,
        records: &[MistakeRecord],
        rng: &mut R,
    ) -> Vec<Challenge> {
        let items: Vec<Item> = records.iter().map(MistakeRecord::to_item).collect();
        self.generate(&items, rng)
    }
}

fn quiz<R: Rng + ?Sized>(term: &Term, rng: &mut R) -> Challenge {
    Challenge::Quiz(QuizChallenge {
        id: ChallengeId::new(),
        question: term.question.clone(),
        answer: term.answer.clone(),
        level: term.level,
        options: build_options(&term.answer, &term.options, rng),
    })
}

fn collides(chunk: &[Term], candidate: &Term) -> bool {
    chunk
        .iter()
        .any(|t| t.question == candidate.question || t.answer == candidate.answer)
}

/// Greedily pack terms into chunks of at most [`CHUNK_SIZE`] in which no two
/// terms share a question or an answer.
///
/// Pool order is preserved as far as the uniqueness rule allows. A term that
/// collides with everything still gets emitted, alone in its chunk.
pub fn pack_unique(terms: Vec<Term>) -> Vec<Vec<Term>> {
    let mut pool = terms;
    let mut chunks = Vec::new();
    let mut current: Vec<Term> = Vec::with_capacity(CHUNK_SIZE);

    while !pool.is_empty() {
        match pool.iter().position(|t| !collides(&current, t)) {
            Some(pos) => {
                current.push(pool.remove(pos));
                if current.len() == CHUNK_SIZE {
                    chunks.push(std::mem::take(&mut current));
                }
            }
            None if !current.is_empty() => chunks.push(std::mem::take(&mut current)),
            None => chunks.push(vec![pool.remove(0)]),
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FillItem, MatchGroup, Pair};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn term(q: &str, a: &str) -> Term {
        Term::new(q, a, 1)
    }

    #[test]
    fn test_pack_unique_splits_duplicates() {
        let chunks = pack_unique(vec![
            term("八", "bā"),
            term("八", "bā"),
            term("爬", "pá"),
            term("马", "mǎ"),
        ]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[1].len(), 1);
        assert_eq!(chunks[1][0].question, "八");
    }

    #[test]
    fn test_pack_unique_shared_answer() {
        let chunks = pack_unique(vec![
            term("他", "tā"),
            term("她", "tā"),
            term("它", "tā"),
        ]);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_pack_unique_full_chunks() {
        let terms: Vec<Term> = (0..9).map(|i| term(&format!("q{i}"), &format!("a{i}"))).collect();
        let sizes: Vec<usize> = pack_unique(terms).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 1]);
    }

    #[test]
    fn test_pack_unique_empty() {
        assert!(pack_unique(vec![]).is_empty());
    }

    #[test]
    fn test_explicit_items_keep_their_shape() {
        let items = vec![
            Item::Quiz(term("八", "bā").with_options(["pā"])),
            Item::Match(MatchGroup {
                items: vec![Pair::new("大", "dà", 1), Pair::new("小", "xiǎo", 1)],
            }),
            Item::Fill(FillItem {
                question: "小__".into(),
                answers: vec!["yú".into()],
                options: vec!["yú".into(), "niǎo".into()],
                level: 1,
            }),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let queue = ChallengeGenerator::default().generate(&items, &mut rng);
        assert_eq!(queue.len(), 3);
        let matches: Vec<_> = queue
            .iter()
            .filter_map(|c| match c {
                Challenge::Match(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pairs.len(), 2);
    }

    #[test]
    fn test_empty_match_group_is_skipped() {
        let items = vec![
            Item::Match(MatchGroup { items: vec![] }),
            Item::Default(term("八", "bā")),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let queue = ChallengeGenerator::default().generate(&items, &mut rng);
        assert_eq!(queue.len(), 1);
        assert!(matches!(&queue[0], Challenge::Match(m) if m.pairs.len() == 1));
    }

    #[test]
    fn test_undersized_chunk_without_options_is_match() {
        let items = vec![Item::Default(term("八", "bā")), Item::Default(term("爬", "pá"))];
        let mut rng = StdRng::seed_from_u64(5);
        let queue = ChallengeGenerator::default().generate(&items, &mut rng);
        assert_eq!(queue.len(), 1);
        assert!(matches!(&queue[0], Challenge::Match(m) if m.pairs.len() == 2));
    }

    #[test]
    fn test_undersized_chunk_with_options_is_quizzes() {
        let items = vec![
            Item::Default(term("八", "bā").with_options(["pā", "bá", "dā"])),
            Item::Default(term("爬", "pá").with_options(["bá", "pā", "dá"])),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let queue = ChallengeGenerator::default().generate(&items, &mut rng);
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|c| matches!(c, Challenge::Quiz(_))));
    }

    #[test]
    fn test_quiz_probability_one_turns_full_chunk_into_quizzes() {
        let items: Vec<Item> = (0..4)
            .map(|i| {
                Item::Default(term(&format!("q{i}"), &format!("a{i}")).with_options(["x", "y", "z"]))
            })
            .collect();
        let generator = ChallengeGenerator::new(GeneratorConfig {
            quiz_probability: 1.0,
        });
        let mut rng = StdRng::seed_from_u64(9);
        let queue = generator.generate(&items, &mut rng);
        assert_eq!(queue.len(), 4);
        assert!(queue.iter().all(|c| matches!(c, Challenge::Quiz(q) if q.options.len() == 4)));
    }

    #[test]
    fn test_generate_from_mistakes_keeps_fill() {
        let fill = MistakeRecord {
            kind: Some(crate::challenge::ChallengeKind::Fill),
            question: "__".into(),
            answer: "a".into(),
            answers: Some(vec!["a".into()]),
            level: 1,
            options: vec!["a".into(), "b".into()],
        };
        let mut rng = StdRng::seed_from_u64(2);
        let queue = ChallengeGenerator::default().generate_from_mistakes(&[fill], &mut rng);
        assert!(matches!(&queue[..], [Challenge::Fill(_)]));
    }
}
