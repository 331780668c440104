//! The round-by-round state machine.
//!
//! The engine owns the challenge queue, the mistake tracker and whatever the
//! learner is doing with the current challenge. It never talks to storage or
//! sound directly: everything observable is pushed as an [`EngineEvent`] and
//! the owner drains them. Feedback delays are scheduled on a virtual clock
//! that the owner advances with [`RoundEngine::advance_time`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cards::{deal_cards, Card, CardStatus};
use crate::challenge::{Challenge, ChallengeId, FillChallenge, QuizChallenge};
use crate::generator::{ChallengeGenerator, GeneratorConfig};
use crate::item::{Item, Pair};
use crate::mistakes::{MistakeRecord, MistakeTracker};
use crate::report::SessionRecord;
use crate::scheduler::{Scheduler, TimerToken};

/// Feedback delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub quiz_feedback_ms: u64,
    pub match_resolve_ms: u64,
    pub match_error_ms: u64,
    pub round_pause_ms: u64,
    pub fill_success_ms: u64,
    pub fill_reset_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            quiz_feedback_ms: 1000,
            match_resolve_ms: 200,
            match_error_ms: 800,
            round_pause_ms: 500,
            fill_success_ms: 1000,
            fill_reset_ms: 1200,
        }
    }
}

impl Pacing {
    /// Every delay zero; timers still need a (zero length) clock advance to fire.
    pub fn instant() -> Self {
        Self {
            quiz_feedback_ms: 0,
            match_resolve_ms: 0,
            match_error_ms: 0,
            round_pause_ms: 0,
            fill_success_ms: 0,
            fill_reset_ms: 0,
        }
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineOptions {
    pub generator: GeneratorConfig,
    pub pacing: Pacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum GameStatus {
    Idle,
    Playing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    Main,
    Retry,
}

/// What a success or error was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Quiz(QuizChallenge),
    Pair(Pair),
    Fill(FillChallenge),
}

impl Subject {
    pub fn question(&self) -> &str {
        match self {
            Subject::Quiz(q) => &q.question,
            Subject::Pair(p) => &p.question,
            Subject::Fill(f) => &f.question,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Success(Subject),
    Error(Subject),
    Win,
    MistakeRecorded(MistakeRecord),
    /// A question answered correctly during mistake review.
    MistakeResolved(String),
    PhaseChanged(Phase),
    ChallengeLoaded(ChallengeId),
    Completed(SessionRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    pub selected: Option<String>,
    pub verdict: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub cards: Vec<Card>,
    /// Index into `cards` of the first card of a pending pair.
    pub selected: Option<usize>,
}

impl MatchState {
    pub fn matched_fraction(&self) -> f64 {
        if self.cards.is_empty() {
            return 0.0;
        }
        self.cards.iter().filter(|c| c.is_matched()).count() as f64 / self.cards.len() as f64
    }

    fn all_matched(&self) -> bool {
        self.cards.iter().all(Card::is_matched)
    }

    fn set_status(&mut self, a: usize, b: usize, status: CardStatus) {
        for i in [a, b] {
            if let Some(card) = self.cards.get_mut(i) {
                card.status = status;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOption {
    pub text: String,
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillState {
    /// Each slot holds the index of the pool option placed in it.
    pub slots: Vec<Option<usize>>,
    pub pool: Vec<PoolOption>,
    pub verdict: Option<bool>,
}

impl FillState {
    fn new(challenge: &FillChallenge) -> Self {
        Self {
            slots: vec![None; challenge.slot_count()],
            pool: challenge
                .options
                .iter()
                .map(|text| PoolOption {
                    text: text.clone(),
                    used: false,
                })
                .collect(),
            verdict: None,
        }
    }

    pub fn slot_text(&self, slot: usize) -> Option<&str> {
        let idx = (*self.slots.get(slot)?)?;
        self.pool.get(idx).map(|o| o.text.as_str())
    }

    /// Slot contents, or `None` while any slot is still empty.
    fn filled(&self) -> Option<Vec<&str>> {
        (0..self.slots.len()).map(|i| self.slot_text(i)).collect()
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.pool.iter_mut().for_each(|o| o.used = false);
        self.verdict = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RoundState {
    Quiz(QuizState),
    Match(MatchState),
    Fill(FillState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Advance,
    QuizRetry,
    MatchResolved(usize, usize),
    MatchShowError(usize, usize),
    MatchRevert(usize, usize),
    FillReset,
}

pub struct RoundEngine {
    generator: ChallengeGenerator,
    pacing: Pacing,
    rng: Box<dyn RngCore>,
    status: GameStatus,
    phase: Phase,
    queue: Vec<Challenge>,
    index: usize,
    round: Option<RoundState>,
    is_processing: bool,
    tracker: MistakeTracker,
    course_title: String,
    is_mistake_mode: bool,
    total_items: usize,
    started_at: Option<DateTime<Utc>>,
    timers: Scheduler<Timer>,
    /// Timers scheduled for the current challenge.
    round_timers: Vec<TimerToken>,
    events: Vec<EngineEvent>,
}

impl RoundEngine {
    pub fn new(options: EngineOptions, rng: Box<dyn RngCore>) -> Self {
        Self {
            generator: ChallengeGenerator::new(options.generator),
            pacing: options.pacing,
            rng,
            status: GameStatus::Idle,
            phase: Phase::Main,
            queue: Vec::new(),
            index: 0,
            round: None,
            is_processing: false,
            tracker: MistakeTracker::new(),
            course_title: String::new(),
            is_mistake_mode: false,
            total_items: 0,
            started_at: None,
            timers: Scheduler::new(),
            round_timers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Start a session over `items`. Returns false, leaving the engine
    /// untouched, when the items produce no challenges.
    pub fn start(&mut self, items: &[Item], course_title: &str, is_mistake_mode: bool) -> bool {
        let queue = self.generator.generate(items, &mut *self.rng);
        if queue.is_empty() {
            debug!(target: "pinyin_match", course = course_title, "no challenges, not starting");
            return false;
        }

        self.reset();
        self.queue = queue;
        self.status = GameStatus::Playing;
        self.course_title = course_title.to_string();
        self.is_mistake_mode = is_mistake_mode;
        self.total_items = items.iter().map(Item::question_count).sum();
        self.started_at = Some(Utc::now());
        info!(
            target: "pinyin_match",
            course = course_title,
            challenges = self.queue.len(),
            total_items = self.total_items,
            mistake_mode = is_mistake_mode,
            "session started"
        );
        self.load_current();
        true
    }

    /// Abandon whatever is in progress. Pending timers are dropped.
    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.round_timers.clear();
        self.status = GameStatus::Idle;
        self.phase = Phase::Main;
        self.queue.clear();
        self.index = 0;
        self.round = None;
        self.is_processing = false;
        self.tracker.reset();
        self.course_title.clear();
        self.is_mistake_mode = false;
        self.total_items = 0;
        self.started_at = None;
        self.events.clear();
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move the virtual clock forward, firing every timer that comes due.
    pub fn advance_time(&mut self, elapsed: Duration) {
        let deadline = self.timers.now() + elapsed;
        while let Some(timer) = self.timers.pop_due(deadline) {
            self.fire(timer);
        }
        self.timers.advance_to(deadline);
    }

    /// Run the clock until no timers are left.
    pub fn settle(&mut self) {
        while let Some(due) = self.timers.next_due() {
            let elapsed = due.saturating_sub(self.timers.now());
            self.advance_time(elapsed);
        }
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_idle()
    }

    // --- learner input ---

    /// Pick an option of the current quiz by its text.
    pub fn choose_option(&mut self, option: &str) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(Challenge::Quiz(quiz)) = self.queue.get(self.index) else {
            return false;
        };
        if !quiz.options.iter().any(|o| o == option) {
            return false;
        }
        let quiz = quiz.clone();
        let correct = option == quiz.answer;
        if let Some(RoundState::Quiz(state)) = self.round.as_mut() {
            state.selected = Some(option.to_string());
            state.verdict = Some(correct);
        }
        self.is_processing = true;
        debug!(target: "pinyin_match", question = %quiz.question, option, correct, "quiz answer");

        if correct {
            self.resolve(&quiz.question);
            self.events.push(EngineEvent::Success(Subject::Quiz(quiz)));
            self.schedule(self.pacing.quiz_feedback_ms, Timer::Advance);
        } else {
            self.record_mistake(MistakeRecord::from_quiz(&quiz));
            self.events.push(EngineEvent::Error(Subject::Quiz(quiz)));
            self.schedule(self.pacing.quiz_feedback_ms, Timer::QuizRetry);
        }
        true
    }

    /// Select a card of the current matching round by id.
    pub fn select_card(&mut self, card_id: &str) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(RoundState::Match(state)) = self.round.as_mut() else {
            return false;
        };
        let Some(idx) = state.cards.iter().position(|c| c.id == card_id) else {
            return false;
        };
        if state.cards[idx].is_matched() {
            return false;
        }

        let first = match state.selected {
            None => {
                state.cards[idx].status = CardStatus::Selected;
                state.selected = Some(idx);
                return true;
            }
            Some(first) if first == idx => {
                state.cards[idx].status = CardStatus::Idle;
                state.selected = None;
                return true;
            }
            Some(first) => first,
        };

        state.cards[idx].status = CardStatus::Selected;
        state.selected = None;
        let (a, b) = (&state.cards[first], &state.cards[idx]);
        let is_pair = a.question == b.question && a.side != b.side;
        let questions = (a.question.clone(), b.question.clone());
        self.is_processing = true;

        let Some(Challenge::Match(challenge)) = self.queue.get(self.index) else {
            return true;
        };
        let pair = challenge.pair_for(&questions.0, &questions.1).cloned();
        debug!(target: "pinyin_match", first = %questions.0, second = %questions.1, is_pair, "cards compared");

        if is_pair {
            if let Some(pair) = pair {
                self.resolve(&pair.question);
                self.events.push(EngineEvent::Success(Subject::Pair(pair)));
            }
            self.schedule(self.pacing.match_resolve_ms, Timer::MatchResolved(first, idx));
        } else {
            if let Some(pair) = pair {
                let record = MistakeRecord::from_pair(&pair, challenge);
                self.record_mistake(record);
                self.events.push(EngineEvent::Error(Subject::Pair(pair)));
            }
            self.schedule(self.pacing.match_resolve_ms, Timer::MatchShowError(first, idx));
        }
        true
    }

    /// Put pool option `pool_index` into `slot`, or the first empty slot.
    pub fn place_option(&mut self, pool_index: usize, slot: Option<usize>) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(RoundState::Fill(state)) = self.round.as_mut() else {
            return false;
        };
        match state.pool.get(pool_index) {
            Some(option) if !option.used => {}
            _ => return false,
        }
        let target = match slot {
            Some(s) if s < state.slots.len() => s,
            Some(_) => return false,
            None => match state.slots.iter().position(Option::is_none) {
                Some(s) => s,
                None => return false,
            },
        };
        if let Some(previous) = state.slots[target].replace(pool_index) {
            state.pool[previous].used = false;
        }
        state.pool[pool_index].used = true;

        let filled = state
            .filled()
            .map(|texts| texts.into_iter().map(str::to_owned).collect::<Vec<_>>());
        if let Some(filled) = filled {
            self.evaluate_fill(&filled);
        }
        true
    }

    /// Empty a slot and return its option to the pool.
    pub fn clear_slot(&mut self, slot: usize) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(RoundState::Fill(state)) = self.round.as_mut() else {
            return false;
        };
        match state.slots.get_mut(slot).and_then(Option::take) {
            Some(idx) => {
                state.pool[idx].used = false;
                true
            }
            None => false,
        }
    }

    // --- queries ---

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn is_mistake_mode(&self) -> bool {
        self.is_mistake_mode
    }

    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn queue(&self) -> &[Challenge] {
        &self.queue
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_challenge(&self) -> Option<&Challenge> {
        match self.status {
            GameStatus::Playing => self.queue.get(self.index),
            _ => None,
        }
    }

    pub fn quiz_state(&self) -> Option<&QuizState> {
        match &self.round {
            Some(RoundState::Quiz(s)) => Some(s),
            _ => None,
        }
    }

    pub fn match_state(&self) -> Option<&MatchState> {
        match &self.round {
            Some(RoundState::Match(s)) => Some(s),
            _ => None,
        }
    }

    pub fn fill_state(&self) -> Option<&FillState> {
        match &self.round {
            Some(RoundState::Fill(s)) => Some(s),
            _ => None,
        }
    }

    pub fn session_mistakes(&self) -> &[MistakeRecord] {
        self.tracker.session_mistakes()
    }

    pub fn all_mistakes(&self) -> &[MistakeRecord] {
        self.tracker.all_mistakes()
    }

    /// Percent complete. The retry phase always reports 100.
    pub fn progress(&self) -> f64 {
        match (self.status, self.phase) {
            (GameStatus::Idle, _) => 0.0,
            (GameStatus::Completed, _) | (GameStatus::Playing, Phase::Retry) => 100.0,
            (GameStatus::Playing, Phase::Main) => {
                let step = 100.0 / self.queue.len().max(1) as f64;
                let partial = self.match_state().map_or(0.0, MatchState::matched_fraction);
                ((self.index as f64 + partial) * step).min(100.0)
            }
        }
    }

    // --- internals ---

    fn accepts_input(&self) -> bool {
        self.status == GameStatus::Playing && !self.is_processing
    }

    fn resolve(&mut self, question: &str) {
        if self.is_mistake_mode {
            self.events
                .push(EngineEvent::MistakeResolved(question.to_string()));
        }
    }

    fn record_mistake(&mut self, record: MistakeRecord) {
        self.tracker.record(record.clone());
        self.events.push(EngineEvent::MistakeRecorded(record));
    }

    fn evaluate_fill(&mut self, filled: &[String]) {
        let Some(Challenge::Fill(fill)) = self.queue.get(self.index) else {
            return;
        };
        let fill = fill.clone();
        let correct = fill.is_solved_by(filled);
        if let Some(RoundState::Fill(state)) = self.round.as_mut() {
            state.verdict = Some(correct);
        }
        self.is_processing = true;
        debug!(target: "pinyin_match", question = %fill.question, correct, "blanks checked");

        if correct {
            self.resolve(&fill.question);
            self.events.push(EngineEvent::Success(Subject::Fill(fill)));
            self.schedule(self.pacing.fill_success_ms, Timer::Advance);
        } else {
            self.record_mistake(MistakeRecord::from_fill(&fill));
            self.events.push(EngineEvent::Error(Subject::Fill(fill)));
            self.schedule(self.pacing.fill_reset_ms, Timer::FillReset);
        }
    }

    fn fire(&mut self, timer: Timer) {
        if self.status != GameStatus::Playing {
            return;
        }
        if timer == Timer::Advance {
            self.advance();
            return;
        }
        match (timer, self.round.as_mut()) {
            (Timer::QuizRetry, Some(RoundState::Quiz(state))) => {
                *state = QuizState::default();
                self.is_processing = false;
            }
            (Timer::MatchResolved(a, b), Some(RoundState::Match(state))) => {
                state.set_status(a, b, CardStatus::Matched);
                if state.all_matched() {
                    self.schedule(self.pacing.round_pause_ms, Timer::Advance);
                } else {
                    self.is_processing = false;
                }
            }
            (Timer::MatchShowError(a, b), Some(RoundState::Match(state))) => {
                state.set_status(a, b, CardStatus::Error);
                self.schedule(self.pacing.match_error_ms, Timer::MatchRevert(a, b));
            }
            (Timer::MatchRevert(a, b), Some(RoundState::Match(state))) => {
                state.set_status(a, b, CardStatus::Idle);
                self.is_processing = false;
            }
            (Timer::FillReset, Some(RoundState::Fill(state))) => {
                state.clear();
                self.is_processing = false;
            }
            (timer, _) => {
                debug!(target: "pinyin_match", ?timer, "stale timer ignored");
            }
        }
    }

    fn load_current(&mut self) {
        let Some(challenge) = self.queue.get(self.index) else {
            self.complete();
            return;
        };
        let id = challenge.id();
        let round = match challenge {
            Challenge::Quiz(_) => RoundState::Quiz(QuizState::default()),
            Challenge::Match(m) => RoundState::Match(MatchState {
                cards: deal_cards(m, &mut *self.rng),
                selected: None,
            }),
            Challenge::Fill(f) => RoundState::Fill(FillState::new(f)),
        };
        let empty_fill = matches!(&round, RoundState::Fill(s) if s.slots.is_empty());
        self.round = Some(round);
        self.is_processing = false;
        self.events.push(EngineEvent::ChallengeLoaded(id));
        debug!(target: "pinyin_match", index = self.index, %id, "challenge loaded");

        if empty_fill {
            self.evaluate_fill(&[]);
        }
    }

    fn schedule(&mut self, delay_ms: u64, timer: Timer) {
        let token = self.timers.schedule(ms(delay_ms), timer);
        self.round_timers.push(token);
    }

    /// Drop whatever the finished challenge still had pending.
    fn cancel_round_timers(&mut self) {
        for token in self.round_timers.drain(..) {
            self.timers.cancel(token);
        }
    }

    fn advance(&mut self) {
        self.cancel_round_timers();
        self.round = None;
        self.is_processing = false;
        if self.index + 1 < self.queue.len() {
            self.index += 1;
            self.load_current();
            return;
        }

        let missed = self.tracker.take_session();
        if missed.is_empty() {
            self.complete();
            return;
        }
        self.queue = self.generator.generate_from_mistakes(&missed, &mut *self.rng);
        self.index = 0;
        self.phase = Phase::Retry;
        info!(
            target: "pinyin_match",
            missed = missed.len(),
            challenges = self.queue.len(),
            "entering retry pass"
        );
        self.events.push(EngineEvent::PhaseChanged(Phase::Retry));
        self.load_current();
    }

    fn complete(&mut self) {
        if self.status == GameStatus::Completed {
            return;
        }
        self.timers.cancel_all();
        self.status = GameStatus::Completed;
        self.round = None;
        self.is_processing = false;

        let end_time = Utc::now();
        let start_time = self.started_at.unwrap_or(end_time);
        let record = SessionRecord {
            id: format!("session-{}", Uuid::new_v4()),
            course_title: self.course_title.clone(),
            start_time,
            end_time,
            duration: (end_time - start_time).num_milliseconds().max(0) as u64,
            total_items: self.total_items,
            mistakes: self.tracker.all_mistakes().to_vec(),
        };
        info!(
            target: "pinyin_match",
            course = %record.course_title,
            accuracy = record.accuracy(),
            mistakes = record.mistakes.len(),
            "session completed"
        );
        self.events.push(EngineEvent::Win);
        self.events.push(EngineEvent::Completed(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FillItem, MatchGroup, Term};
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> RoundEngine {
        RoundEngine::new(
            EngineOptions {
                generator: GeneratorConfig {
                    quiz_probability: 0.0,
                },
                pacing: Pacing::default(),
            },
            Box::new(StdRng::seed_from_u64(42)),
        )
    }

    fn match_item() -> Item {
        Item::Match(MatchGroup {
            items: vec![
                Pair::new("八", "bā", 1),
                Pair::new("爬", "pá", 1),
                Pair::new("马", "mǎ", 1),
                Pair::new("大", "dà", 1),
            ],
        })
    }

    fn quiz_item() -> Item {
        Item::Quiz(Term::new("八", "bā", 1).with_options(["pā", "bá", "dā"]))
    }

    fn fill_item() -> Item {
        Item::Fill(FillItem {
            question: "小__在__里游。".into(),
            answers: vec!["yú".into(), "shuǐ".into()],
            options: vec!["shuǐ".into(), "yú".into(), "niǎo".into()],
            level: 1,
        })
    }

    fn card_id(e: &RoundEngine, question: &str, side: crate::cards::CardSide) -> String {
        e.match_state()
            .unwrap()
            .cards
            .iter()
            .find(|c| c.question == question && c.side == side)
            .unwrap()
            .id
            .clone()
    }

    fn match_pair(e: &mut RoundEngine, question: &str) {
        use crate::cards::CardSide;
        let q = card_id(e, question, CardSide::Question);
        let a = card_id(e, question, CardSide::Answer);
        assert!(e.select_card(&q));
        assert!(e.select_card(&a));
        e.advance_time(ms(200));
    }

    #[test]
    fn test_start_with_no_items_stays_idle() {
        let mut e = engine();
        assert!(!e.start(&[], "空", false));
        assert_eq!(e.status(), GameStatus::Idle);
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn test_empty_match_group_does_not_start() {
        let mut e = engine();
        let empty = Item::Match(MatchGroup { items: vec![] });
        assert!(!e.start(&[empty], "空", false));
        assert_eq!(e.status(), GameStatus::Idle);
        assert!(!e.has_pending_timers());
    }

    #[test]
    fn test_repeated_pair_round_can_finish() {
        use crate::cards::CardSide;
        let mut e = engine();
        let repeated = Item::Match(MatchGroup {
            items: vec![Pair::new("他", "tā", 1), Pair::new("他", "tā", 1)],
        });
        assert!(e.start(&[repeated], "重复", false));

        for _ in 0..2 {
            let state = e.match_state().unwrap();
            let open = |side: CardSide| {
                state
                    .cards
                    .iter()
                    .find(|c| c.side == side && !c.is_matched())
                    .unwrap()
                    .id
                    .clone()
            };
            let (q, a) = (open(CardSide::Question), open(CardSide::Answer));
            assert!(e.select_card(&q));
            assert!(e.select_card(&a));
            e.advance_time(ms(200));
        }
        e.settle();

        assert_eq!(e.status(), GameStatus::Completed);
        assert!(e.all_mistakes().is_empty());
    }

    #[test]
    fn test_perfect_match_round_completes() {
        let mut e = engine();
        assert!(e.start(&[match_item()], "第一课", false));
        assert_eq!(e.total_items(), 4);
        for q in ["八", "爬", "马", "大"] {
            match_pair(&mut e, q);
        }
        assert_eq!(e.status(), GameStatus::Playing);
        assert_eq!(e.progress(), 100.0);
        e.advance_time(ms(500));
        assert_eq!(e.status(), GameStatus::Completed);

        let events = e.drain_events();
        assert!(events.contains(&EngineEvent::Win));
        let record = events
            .iter()
            .find_map(|ev| match ev {
                EngineEvent::Completed(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert!(record.mistakes.is_empty());
        assert_eq!(record.accuracy(), 100);
    }

    #[test]
    fn test_reselecting_card_deselects() {
        use crate::cards::CardSide;
        let mut e = engine();
        e.start(&[match_item()], "t", false);
        let q = card_id(&e, "八", CardSide::Question);
        assert!(e.select_card(&q));
        assert!(e.select_card(&q));
        let state = e.match_state().unwrap();
        assert_eq!(state.selected, None);
        assert!(state.cards.iter().all(|c| c.status == CardStatus::Idle));
        assert!(!e.select_card("nope"));
    }

    #[test]
    fn test_mismatch_flashes_error_then_reverts() {
        use crate::cards::CardSide;
        let mut e = engine();
        e.start(&[match_item()], "t", false);
        let q = card_id(&e, "八", CardSide::Question);
        let wrong = card_id(&e, "爬", CardSide::Answer);
        e.select_card(&q);
        e.select_card(&wrong);
        assert!(e.is_processing());
        assert_eq!(e.session_mistakes().len(), 1);
        assert_eq!(e.session_mistakes()[0].question, "八");

        let other = card_id(&e, "马", CardSide::Question);
        assert!(!e.select_card(&other));

        e.advance_time(ms(200));
        let errors = e
            .match_state()
            .unwrap()
            .cards
            .iter()
            .filter(|c| c.status == CardStatus::Error)
            .count();
        assert_eq!(errors, 2);
        e.advance_time(ms(800));
        assert!(!e.is_processing());
        assert!(e
            .match_state()
            .unwrap()
            .cards
            .iter()
            .all(|c| c.status == CardStatus::Idle));
    }

    #[test]
    fn test_quiz_wrong_then_right() {
        let mut e = engine();
        e.start(&[quiz_item()], "t", false);
        assert!(!e.choose_option("zzz"));
        assert!(e.choose_option("pā"));
        assert_eq!(e.quiz_state().unwrap().verdict, Some(false));
        assert!(!e.choose_option("bā"));
        e.advance_time(ms(1000));
        assert_eq!(e.quiz_state().unwrap(), &QuizState::default());
        assert!(e.choose_option("bā"));
        e.advance_time(ms(1000));
        // the miss sends the quiz around again
        assert_eq!(e.phase(), Phase::Retry);
        assert_eq!(e.status(), GameStatus::Playing);
        assert_eq!(e.progress(), 100.0);
    }

    #[test]
    fn test_fill_wrong_resets_and_right_advances() {
        let mut e = engine();
        e.start(&[fill_item()], "t", false);
        // shuǐ into slot 0, yú into slot 1: wrong order
        assert!(e.place_option(0, None));
        assert!(!e.place_option(0, None));
        assert!(e.place_option(1, None));
        assert_eq!(e.fill_state().unwrap().verdict, Some(false));
        assert_eq!(e.session_mistakes().len(), 1);
        e.advance_time(ms(1200));
        let state = e.fill_state().unwrap();
        assert!(state.slots.iter().all(Option::is_none));
        assert!(state.pool.iter().all(|o| !o.used));

        assert!(e.place_option(1, Some(0)));
        assert!(e.place_option(0, Some(1)));
        assert_eq!(e.fill_state().unwrap().verdict, Some(true));
    }

    #[test]
    fn test_fill_replace_and_clear() {
        let mut e = engine();
        e.start(&[fill_item()], "t", false);
        assert!(e.place_option(2, Some(0)));
        assert!(e.place_option(1, Some(0)));
        let state = e.fill_state().unwrap();
        assert!(!state.pool[2].used);
        assert_eq!(state.slot_text(0), Some("yú"));
        assert!(e.clear_slot(0));
        assert!(!e.clear_slot(0));
        assert!(e.fill_state().unwrap().pool.iter().all(|o| !o.used));
    }

    #[test]
    fn test_reset_cancels_timers() {
        let mut e = engine();
        e.start(&[quiz_item()], "t", false);
        e.choose_option("bā");
        assert!(e.has_pending_timers());
        e.reset();
        assert!(!e.has_pending_timers());
        e.advance_time(ms(5000));
        assert_eq!(e.status(), GameStatus::Idle);
    }

    #[test]
    fn test_mistake_mode_emits_resolved() {
        let mut e = engine();
        e.start(&[quiz_item()], "错题练习", true);
        e.choose_option("bā");
        assert_matches!(
            e.drain_events().as_slice(),
            [EngineEvent::ChallengeLoaded(_), EngineEvent::MistakeResolved(q), EngineEvent::Success(_)] if q == "八"
        );
    }

    #[test]
    fn test_progress_is_monotonic_in_main_phase() {
        let mut e = engine();
        let items = vec![match_item(), fill_item()];
        e.start(&items, "t", false);
        let mut last = e.progress();
        for _ in 0..20 {
            if e.status() != GameStatus::Playing || e.phase() != Phase::Main {
                break;
            }
            if let Some(state) = e.match_state() {
                let next = state.cards.iter().find(|c| !c.is_matched()).map(|c| c.question.clone());
                if let Some(q) = next {
                    match_pair(&mut e, &q);
                }
            } else if e.fill_state().is_some() {
                e.place_option(1, Some(0));
                e.place_option(0, Some(1));
            }
            e.settle();
            let now = e.progress();
            assert!(now >= last, "{now} < {last}");
            last = now;
        }
        assert_eq!(e.status(), GameStatus::Completed);
    }
}
