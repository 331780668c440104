//! Plain-text rendering of engine state and parsing of typed commands.

use std::fmt::Write as _;

use crate::cards::CardStatus;
use crate::catalog::Catalog;
use crate::challenge::Challenge;
use crate::engine::{GameStatus, Phase, RoundEngine};
use crate::util::{max_width, pad_to_width};

const BAR_WIDTH: usize = 20;

/// What a line of learner input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Choose(String),
    Select(String),
    Place { pool: usize, slot: Option<usize> },
    Clear(usize),
}

/// Interpret `input` against the current challenge. Numbers are 1-based.
pub fn parse_command(input: &str, engine: &RoundEngine) -> Option<Command> {
    let input = input.trim();
    if matches!(input, "q" | "quit" | "exit") {
        return Some(Command::Quit);
    }
    let number = |s: &str| s.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1);

    match engine.current_challenge()? {
        Challenge::Quiz(quiz) => match number(input) {
            Some(i) => quiz.options.get(i).cloned().map(Command::Choose),
            None => quiz
                .options
                .iter()
                .find(|o| o.as_str() == input)
                .cloned()
                .map(Command::Choose),
        },
        Challenge::Match(_) => {
            let cards = &engine.match_state()?.cards;
            let i = number(input)?;
            cards.get(i).map(|c| Command::Select(c.id.clone()))
        }
        Challenge::Fill(_) => {
            let mut parts = input.split_whitespace();
            match (parts.next()?, parts.next(), parts.next()) {
                ("c", Some(slot), None) => number(slot).map(Command::Clear),
                (pool, None, None) => number(pool).map(|pool| Command::Place { pool, slot: None }),
                (pool, Some(slot), None) => Some(Command::Place {
                    pool: number(pool)?,
                    slot: Some(number(slot)?),
                }),
                _ => None,
            }
        }
    }
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}

fn card_mark(status: CardStatus) -> char {
    match status {
        CardStatus::Idle => ' ',
        CardStatus::Selected => '*',
        CardStatus::Matched => '✓',
        CardStatus::Error => '✗',
    }
}

/// Screen for the current challenge.
pub fn render_engine(engine: &RoundEngine) -> String {
    let mut out = String::new();
    if engine.status() != GameStatus::Playing {
        return out;
    }
    let phase = match engine.phase() {
        Phase::Main => "",
        Phase::Retry => " 复习错题",
    };
    let _ = writeln!(
        out,
        "\n{} {}{}",
        engine.course_title(),
        progress_bar(engine.progress(), BAR_WIDTH),
        phase
    );

    match engine.current_challenge() {
        Some(Challenge::Quiz(quiz)) => {
            let state = engine.quiz_state();
            let _ = writeln!(out, "  {}", quiz.question);
            for (i, option) in quiz.options.iter().enumerate() {
                let chosen = state.and_then(|s| s.selected.as_deref()) == Some(option.as_str());
                let mark = match (chosen, state.and_then(|s| s.verdict)) {
                    (true, Some(true)) => '✓',
                    (true, Some(false)) => '✗',
                    _ => ' ',
                };
                let _ = writeln!(out, "  {}{}. {}", mark, i + 1, option);
            }
        }
        Some(Challenge::Match(_)) => {
            if let Some(state) = engine.match_state() {
                let width = max_width(state.cards.iter().map(|c| c.display.as_str()));
                for (row, pair) in state.cards.chunks(2).enumerate() {
                    let mut line = String::from(" ");
                    for (col, card) in pair.iter().enumerate() {
                        let n = row * 2 + col + 1;
                        let _ = write!(
                            line,
                            " {}{:>2}. {}",
                            card_mark(card.status),
                            n,
                            pad_to_width(&card.display, width)
                        );
                    }
                    let _ = writeln!(out, "{}", line.trim_end());
                }
            }
        }
        Some(Challenge::Fill(fill)) => {
            if let Some(state) = engine.fill_state() {
                let mut sentence = String::new();
                for (i, segment) in fill.segments().iter().enumerate() {
                    sentence.push_str(segment);
                    if i < state.slots.len() && i + 1 < fill.segments().len() {
                        match state.slot_text(i) {
                            Some(text) => {
                                let _ = write!(sentence, "[{text}]");
                            }
                            None => {
                                let _ = write!(sentence, "[{}]", i + 1);
                            }
                        }
                    }
                }
                let mark = match state.verdict {
                    Some(true) => " ✓",
                    Some(false) => " ✗",
                    None => "",
                };
                let _ = writeln!(out, "  {sentence}{mark}");
                let pool: Vec<String> = state
                    .pool
                    .iter()
                    .enumerate()
                    .map(|(i, o)| {
                        if o.used {
                            format!("{}.({})", i + 1, o.text)
                        } else {
                            format!("{}. {}", i + 1, o.text)
                        }
                    })
                    .collect();
                let _ = writeln!(out, "  {}", pool.join("  "));
            }
        }
        None => {}
    }
    out
}

/// Course listing grouped the way the catalog is.
pub fn render_courses(catalog: &Catalog) -> String {
    let mut out = String::new();
    let id_width = max_width(catalog.courses().map(|c| c.id.as_str()));
    let title_width = max_width(catalog.courses().map(|c| c.title.as_str()));
    for group in catalog.groups() {
        let _ = writeln!(out, "{} ({})", group.title, group.category);
        for course in &group.courses {
            let _ = writeln!(
                out,
                "  {}  {}  {:>3}  {}",
                pad_to_width(&course.id, id_width),
                pad_to_width(&course.title, title_width),
                course.question_count(),
                course.description
            );
        }
    }
    out
}
