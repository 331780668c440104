use std::sync::mpsc;
use std::time::Duration;

use pinyin_match::{
    catalog::Catalog,
    config::Config,
    engine::{GameStatus, Pacing},
    runtime::{DrillEvent, FixedTicker, Runner, TestEventSource},
    session::SessionCoordinator,
    storage::MemoryStore,
    ui::{parse_command, Command},
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn coordinator(pacing: Pacing) -> SessionCoordinator {
    let config = Config {
        quiz_probability: 0.0,
        pacing,
        ..Config::default()
    };
    SessionCoordinator::new(
        config,
        Catalog::load_course_catalog().unwrap(),
        Box::new(MemoryStore::new()),
        Box::new(MemoryStore::new()),
    )
    .with_rng(Box::new(StdRng::seed_from_u64(99)))
}

fn apply(c: &mut SessionCoordinator, line: &str) -> bool {
    let accepted = match parse_command(line, c.engine()) {
        Some(Command::Choose(option)) => c.engine_mut().choose_option(&option),
        Some(Command::Select(id)) => c.engine_mut().select_card(&id),
        Some(Command::Place { pool, slot }) => c.engine_mut().place_option(pool, slot),
        Some(Command::Clear(slot)) => c.engine_mut().clear_slot(slot),
        Some(Command::Quit) | None => false,
    };
    c.pump();
    accepted
}

// Headless integration using the internal runtime + coordinator without a TTY.
// Verifies that a quiz course completes when answers arrive as lines.
#[test]
fn headless_quiz_flow_completes() {
    let mut c = coordinator(Pacing::instant());
    assert!(c.start_course_by_id("test-quiz").unwrap());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    // both answers, each twice, so either queue order finishes
    for line in ["cè shì", "kuài lè", "cè shì", "kuài lè"] {
        tx.send(DrillEvent::Line(line.to_string())).unwrap();
    }
    tx.send(DrillEvent::Closed).unwrap();

    for _ in 0..100u32 {
        c.tick(Duration::from_millis(5));
        match runner.step() {
            DrillEvent::Tick => {}
            DrillEvent::Closed => break,
            DrillEvent::Line(line) => {
                apply(&mut c, &line);
            }
        }
        if c.engine().status() == GameStatus::Completed {
            break;
        }
    }

    assert_eq!(c.engine().status(), GameStatus::Completed);
    let record = c.last_record().expect("record after completion");
    assert_eq!(record.accuracy(), 100);
    assert_eq!(c.history().len(), 1);
}

#[test]
fn input_is_locked_until_feedback_delay_passes() {
    let mut c = coordinator(Pacing::default());
    assert!(c.start_course_by_id("test-quiz").unwrap());

    let first = c.engine().current_challenge().unwrap().id();
    let answer = match c.engine().current_challenge().unwrap() {
        pinyin_match::challenge::Challenge::Quiz(q) => q.answer.clone(),
        other => panic!("expected quiz, got {other:?}"),
    };
    assert!(c.engine_mut().choose_option(&answer));
    assert!(c.engine().is_processing());
    assert!(!c.engine_mut().choose_option(&answer));

    c.tick(Duration::from_millis(999));
    assert_eq!(c.engine().current_challenge().unwrap().id(), first);
    c.tick(Duration::from_millis(1));
    assert_ne!(c.engine().current_challenge().unwrap().id(), first);
    assert!(!c.engine().is_processing());
}

#[test]
fn quit_line_is_recognised_mid_session() {
    let mut c = coordinator(Pacing::instant());
    assert!(c.start_course_by_id("test-quiz").unwrap());
    assert_eq!(parse_command("q", c.engine()), Some(Command::Quit));
    c.exit_session();
    assert_eq!(c.engine().status(), GameStatus::Idle);
    assert!(c.history().is_empty());
}
