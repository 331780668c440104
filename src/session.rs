//! Session coordination: course sampling, review sessions and what happens
//! to engine events once they leave the engine.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Course};
use crate::config::Config;
use crate::engine::{EngineEvent, RoundEngine, Subject};
use crate::error::{CatalogError, StoreResult};
use crate::history::CourseSummary;
use crate::item::Item;
use crate::mistakes::MistakeRecord;
use crate::report::SessionRecord;
use crate::storage::{HistoryStore, MistakeStore};

pub const MISTAKE_SESSION_TITLE: &str = "错题练习";
/// Draws per padding slot before a duplicate question is accepted.
const SUPPLEMENT_ATTEMPTS: usize = 10;

/// Sound/haptic hooks. Implementations must not block.
pub trait Feedback {
    fn notify_success(&mut self, subject: &Subject);
    fn notify_error(&mut self, subject: &Subject);
    fn notify_win(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl Feedback for SilentFeedback {
    fn notify_success(&mut self, _subject: &Subject) {}
    fn notify_error(&mut self, _subject: &Subject) {}
    fn notify_win(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub title: String,
    pub items: Vec<Item>,
    pub is_mistake_mode: bool,
}

pub struct SessionCoordinator {
    config: Config,
    catalog: Catalog,
    mistakes: Box<dyn MistakeStore>,
    history: Box<dyn HistoryStore>,
    feedback: Box<dyn Feedback>,
    rng: Box<dyn RngCore>,
    engine: RoundEngine,
    active: Option<ActiveSession>,
    last_record: Option<SessionRecord>,
    handled_record: Option<String>,
}

impl SessionCoordinator {
    pub fn new(
        config: Config,
        catalog: Catalog,
        mistakes: Box<dyn MistakeStore>,
        history: Box<dyn HistoryStore>,
    ) -> Self {
        let mut rng: Box<dyn RngCore> = Box::new(StdRng::from_entropy());
        let engine = RoundEngine::new(
            config.engine_options(),
            Box::new(StdRng::seed_from_u64(rng.next_u64())),
        );
        Self {
            config,
            catalog,
            mistakes,
            history,
            feedback: Box::new(SilentFeedback),
            rng,
            engine,
            active: None,
            last_record: None,
            handled_record: None,
        }
    }

    /// Replace the randomness source; every later engine is seeded from it.
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_feedback(mut self, feedback: Box<dyn Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &RoundEngine {
        &self.engine
    }

    /// Input goes straight to the engine; call [`pump`](Self::pump) afterwards.
    pub fn engine_mut(&mut self) -> &mut RoundEngine {
        &mut self.engine
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    pub fn mistakes(&self) -> Vec<MistakeRecord> {
        self.mistakes.load_mistakes()
    }

    pub fn history(&self) -> Vec<SessionRecord> {
        self.history.load_history()
    }

    pub fn course_summary(&self) -> Vec<CourseSummary> {
        self.history.summary_by_course()
    }

    /// Play a course: all of it when small enough, otherwise a random sample.
    pub fn start_course(&mut self, course: &Course) -> bool {
        let mut items = course.items.clone();
        if items.len() > self.config.full_course_limit {
            items.shuffle(&mut *self.rng);
            items.truncate(self.config.session_size);
        }
        self.start_items(items, &course.title, false)
    }

    pub fn start_course_by_id(&mut self, id: &str) -> Result<bool, CatalogError> {
        let course = self.catalog.course(id)?.clone();
        Ok(self.start_course(&course))
    }

    /// Review stored mistakes. Returns false when there is nothing to review.
    pub fn start_mistake_session(&mut self) -> bool {
        let stored = self.mistakes.load_mistakes();
        if stored.is_empty() {
            debug!(target: "pinyin_match", "no stored mistakes to review");
            return false;
        }
        let records = self.pick_review_records(stored);
        let items = records.iter().map(MistakeRecord::to_item).collect();
        self.start_items(items, MISTAKE_SESSION_TITLE, true)
    }

    fn pick_review_records(&mut self, mut stored: Vec<MistakeRecord>) -> Vec<MistakeRecord> {
        let size = self.config.mistake_session_size;
        if stored.len() >= size {
            return stored
                .choose_multiple(&mut *self.rng, size)
                .cloned()
                .collect();
        }
        stored.shuffle(&mut *self.rng);
        if stored.len() >= self.config.mistake_min_threshold {
            return stored;
        }

        let levels: Vec<u32> = stored.iter().map(|m| m.level).collect();
        let mut picked = stored;
        for _ in picked.len()..size {
            let Some(&level) = levels.choose(&mut *self.rng) else {
                break;
            };
            let pool = self.catalog.common_level(level);
            let Some(mut candidate) = pool.choose(&mut *self.rng).copied() else {
                continue;
            };
            let mut attempts = 1;
            while attempts < SUPPLEMENT_ATTEMPTS
                && picked.iter().any(|m| m.question == candidate.question)
            {
                if let Some(next) = pool.choose(&mut *self.rng).copied() {
                    candidate = next;
                }
                attempts += 1;
            }
            picked.push(MistakeRecord::from_term(candidate));
        }
        picked.shuffle(&mut *self.rng);
        debug!(target: "pinyin_match", picked = picked.len(), "review session padded");
        picked
    }

    fn start_items(&mut self, items: Vec<Item>, title: &str, is_mistake_mode: bool) -> bool {
        let mut engine = RoundEngine::new(
            self.config.engine_options(),
            Box::new(StdRng::seed_from_u64(self.rng.next_u64())),
        );
        if !engine.start(&items, title, is_mistake_mode) {
            return false;
        }
        self.engine.reset();
        self.engine = engine;
        self.handled_record = None;
        self.active = Some(ActiveSession {
            title: title.to_string(),
            items,
            is_mistake_mode,
        });
        true
    }

    /// Remember a finished session for the report view. History is written
    /// separately when the completion event is pumped.
    pub fn complete_session(&mut self, record: SessionRecord) {
        self.last_record = Some(record);
    }

    /// Show a past session in the report view.
    pub fn select_history_record(&mut self, record: SessionRecord) {
        self.last_record = Some(record);
    }

    /// Drain engine events and apply their side effects. Store failures are
    /// logged and otherwise ignored.
    pub fn pump(&mut self) -> Vec<EngineEvent> {
        let events = self.engine.drain_events();
        for event in &events {
            match event {
                EngineEvent::Success(subject) => self.feedback.notify_success(subject),
                EngineEvent::Error(subject) => self.feedback.notify_error(subject),
                EngineEvent::Win => self.feedback.notify_win(),
                EngineEvent::MistakeRecorded(record) => {
                    if let Err(e) = self.mistakes.save_mistake(record) {
                        warn!(target: "pinyin_match", error = %e, question = %record.question, "failed to save mistake");
                    }
                }
                EngineEvent::MistakeResolved(question) => {
                    if let Err(e) = self.mistakes.remove_mistake(question) {
                        warn!(target: "pinyin_match", error = %e, question = %question, "failed to remove mistake");
                    }
                }
                EngineEvent::Completed(record) => self.handle_completion(record),
                EngineEvent::PhaseChanged(_) | EngineEvent::ChallengeLoaded(_) => {}
            }
        }
        events
    }

    fn handle_completion(&mut self, record: &SessionRecord) {
        if self.handled_record.as_deref() == Some(record.id.as_str()) {
            return;
        }
        self.handled_record = Some(record.id.clone());
        if let Err(e) = self.history.save_session_record(record) {
            warn!(target: "pinyin_match", error = %e, "failed to save session history");
        }
        info!(target: "pinyin_match", id = %record.id, "session record stored");
        self.complete_session(record.clone());
    }

    /// Advance the engine clock and pump whatever that produced.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<EngineEvent> {
        self.engine.advance_time(elapsed);
        self.pump()
    }

    /// Run every pending timer and pump.
    pub fn settle(&mut self) -> Vec<EngineEvent> {
        self.engine.settle();
        self.pump()
    }

    /// Leave the current session without recording it.
    pub fn exit_session(&mut self) {
        self.pump();
        self.engine.reset();
        self.active = None;
    }

    pub fn clear_mistakes(&mut self) -> StoreResult<()> {
        self.mistakes.clear_mistakes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CourseCategory, CourseGroup};
    use crate::item::Term;
    use crate::storage::MemoryStore;
    use itertools::Itertools;

    fn common_catalog(pool_size: usize) -> Catalog {
        let items = (0..pool_size)
            .map(|i| Item::Default(Term::new(format!("c{i}"), format!("p{i}"), 1)))
            .collect();
        Catalog::from_groups(vec![CourseGroup {
            id: "common".into(),
            title: "通用".into(),
            category: CourseCategory::Pinyin,
            order: 0,
            courses: vec![Course {
                id: "common-lv1".into(),
                title: "等级 1".into(),
                description: String::new(),
                items,
            }],
        }])
    }

    fn coordinator(stored: usize) -> SessionCoordinator {
        coordinator_with_pool(stored, 40)
    }

    fn coordinator_with_pool(stored: usize, pool_size: usize) -> SessionCoordinator {
        let mistakes = (0..stored)
            .map(|i| MistakeRecord::from_term(&Term::new(format!("m{i}"), format!("a{i}"), 1)))
            .collect();
        SessionCoordinator::new(
            Config::default(),
            common_catalog(pool_size),
            Box::new(MemoryStore::new().with_mistakes(mistakes)),
            Box::new(MemoryStore::new()),
        )
        .with_rng(Box::new(StdRng::seed_from_u64(8)))
    }

    #[test]
    fn test_review_with_many_mistakes_samples_ten() {
        let mut c = coordinator(14);
        let picked = c.pick_review_records(c.mistakes());
        assert_eq!(picked.len(), 10);
        assert!(picked.iter().all(|m| m.question.starts_with('m')));
    }

    #[test]
    fn test_review_with_some_mistakes_uses_all() {
        let mut c = coordinator(6);
        let picked = c.pick_review_records(c.mistakes());
        assert_eq!(picked.len(), 6);
    }

    #[test]
    fn test_review_with_few_mistakes_is_padded() {
        let mut c = coordinator(2);
        let picked = c.pick_review_records(c.mistakes());
        assert_eq!(picked.len(), 10);
        assert_eq!(picked.iter().filter(|m| m.question.starts_with('m')).count(), 2);
        assert!(picked.iter().map(|m| &m.question).all_unique());
    }

    #[test]
    fn test_padding_accepts_duplicates_when_pool_is_exhausted() {
        let mut c = coordinator_with_pool(2, 1);
        let picked = c.pick_review_records(c.mistakes());
        assert_eq!(picked.len(), 10);
        assert_eq!(picked.iter().filter(|m| m.question == "c0").count(), 8);
    }

    #[test]
    fn test_review_without_mistakes_is_noop() {
        let mut c = coordinator(0);
        assert!(!c.start_mistake_session());
        assert!(c.active_session().is_none());
    }

    #[test]
    fn test_review_session_title() {
        let mut c = coordinator(3);
        assert!(c.start_mistake_session());
        let active = c.active_session().unwrap();
        assert_eq!(active.title, MISTAKE_SESSION_TITLE);
        assert!(active.is_mistake_mode);
        assert!(c.engine().is_mistake_mode());
    }
}
