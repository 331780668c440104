use clap::{Parser, Subcommand};
use pinyin_match::{
    app_dirs::AppDirs,
    catalog::Catalog,
    config::{Config, ConfigStore, FileConfigStore, HistoryBackend},
    engine::{GameStatus, Subject},
    history::HistoryDb,
    report::{history_line, render_report, write_history_csv},
    runtime::{DrillEvent, FixedTicker, Runner, StdinEventSource},
    session::{Feedback, SessionCoordinator},
    storage::{HistoryStore, JsonStore},
    telemetry::init_tracing,
    ui::{parse_command, render_courses, render_engine, Command},
    util::pad_to_width,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::{
    error::Error,
    fs::File,
    io::{self, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 100;

/// pinyin flashcard drills in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Pinyin flashcard drills: card matching, multiple choice and fill-in-the-blank, with mistake review and session history."
)]
pub struct Cli {
    /// directory for mistakes and history (defaults to $PINYIN_MATCH_DATA_DIR or the platform data dir)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// config file to use instead of the platform default
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// seed for shuffling, for reproducible sessions
    #[clap(long, global = true)]
    seed: Option<u64>,

    #[clap(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
enum Cmd {
    /// list bundled courses
    Courses,
    /// play a course
    Play {
        /// course id as shown by `courses`
        course_id: String,
    },
    /// review stored mistakes
    Review,
    /// list past sessions, newest first
    History {
        #[clap(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// aggregate per course instead of listing sessions
        #[clap(long)]
        summary: bool,
    },
    /// show the report of a past session (1 = newest)
    Report { index: usize },
    /// write session history as CSV
    ExportHistory { path: PathBuf },
    /// list stored mistakes
    Mistakes {
        /// forget every stored mistake
        #[clap(long)]
        clear: bool,
    },
}

/// Prints a short line for every right or wrong answer.
struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn notify_success(&mut self, subject: &Subject) {
        println!("  ✓ {}", subject.question());
    }

    fn notify_error(&mut self, subject: &Subject) {
        println!("  ✗ {}", subject.question());
    }

    fn notify_win(&mut self) {
        println!("\n完成!");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FileConfigStore::with_path(path).load(),
        None => FileConfigStore::new().load(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or_else(AppDirs::data_dir);
    let catalog = Catalog::load_course_catalog()?;
    let mut coordinator = coordinator(&cli, config, catalog, data_dir)?;

    match &cli.command {
        Cmd::Courses => print!("{}", render_courses(coordinator.catalog())),
        Cmd::Play { course_id } => {
            if coordinator.start_course_by_id(course_id)? {
                play(&mut coordinator)?;
            } else {
                println!("course {course_id} has nothing to play");
            }
        }
        Cmd::Review => {
            if coordinator.start_mistake_session() {
                play(&mut coordinator)?;
            } else {
                println!("no stored mistakes to review");
            }
        }
        Cmd::History { limit, summary } => {
            if *summary {
                for s in coordinator.course_summary() {
                    println!(
                        "{}  {:>3} sessions  {:>5.1}%  {}s",
                        pad_to_width(&s.course_title, 16),
                        s.sessions,
                        s.avg_accuracy,
                        s.total_duration_ms / 1000
                    );
                }
            } else {
                for (i, record) in coordinator.history().iter().take(*limit).enumerate() {
                    println!("{:>3}. {}", i + 1, history_line(record));
                }
            }
        }
        Cmd::Report { index } => {
            let record = index
                .checked_sub(1)
                .and_then(|i| coordinator.history().into_iter().nth(i));
            match record {
                Some(record) => {
                    coordinator.select_history_record(record);
                    if let Some(record) = coordinator.last_record() {
                        print!("{}", render_report(record));
                    }
                }
                None => println!("no session #{index}"),
            }
        }
        Cmd::ExportHistory { path } => {
            let history = coordinator.history();
            write_history_csv(&history, File::create(path)?)?;
            println!("wrote {} sessions to {}", history.len(), path.display());
        }
        Cmd::Mistakes { clear: true } => {
            coordinator.clear_mistakes()?;
            println!("cleared");
        }
        Cmd::Mistakes { clear: false } => {
            let mistakes = coordinator.mistakes();
            if mistakes.is_empty() {
                println!("no stored mistakes");
            }
            for m in mistakes {
                println!("{}  {}  Lv.{}", pad_to_width(&m.question, 8), m.answer, m.level);
            }
        }
    }

    Ok(())
}

fn coordinator(
    cli: &Cli,
    config: Config,
    catalog: Catalog,
    data_dir: PathBuf,
) -> Result<SessionCoordinator, Box<dyn Error>> {
    let json = JsonStore::new(&data_dir).with_history_limit(config.history_limit);
    let history: Box<dyn HistoryStore> = match config.history_backend {
        HistoryBackend::Json => Box::new(json.clone()),
        HistoryBackend::Sqlite => Box::new(
            HistoryDb::open(AppDirs::history_db_path(&data_dir))?.with_limit(config.history_limit),
        ),
    };
    let mut coordinator = SessionCoordinator::new(config, catalog, Box::new(json), history)
        .with_feedback(Box::new(TerminalFeedback));
    if let Some(seed) = cli.seed {
        coordinator = coordinator.with_rng(Box::new(StdRng::seed_from_u64(seed)));
    }
    Ok(coordinator)
}

fn print_help_line() {
    println!("  (number to answer, fill: `<option> [slot]`, `c <slot>` to clear, q to quit)");
}

fn play(coordinator: &mut SessionCoordinator) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        StdinEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut last = Instant::now();
    let mut dirty = true;
    let mut was_processing = false;
    print_help_line();

    loop {
        let processing = coordinator.engine().is_processing();
        if was_processing && !processing {
            dirty = true;
        }
        was_processing = processing;
        if dirty && !processing {
            print!("{}", render_engine(coordinator.engine()));
            io::stdout().flush()?;
            dirty = false;
        }

        let event = runner.step();
        let now = Instant::now();
        if !coordinator.tick(now - last).is_empty() {
            dirty = true;
        }
        last = now;

        match event {
            DrillEvent::Tick => {}
            DrillEvent::Closed => {
                coordinator.settle();
                if coordinator.engine().status() != GameStatus::Completed {
                    coordinator.exit_session();
                    return Ok(());
                }
            }
            DrillEvent::Line(line) => match parse_command(&line, coordinator.engine()) {
                Some(Command::Quit) => {
                    coordinator.exit_session();
                    return Ok(());
                }
                Some(command) => {
                    let engine = coordinator.engine_mut();
                    let accepted = match command {
                        Command::Choose(option) => engine.choose_option(&option),
                        Command::Select(id) => engine.select_card(&id),
                        Command::Place { pool, slot } => engine.place_option(pool, slot),
                        Command::Clear(slot) => engine.clear_slot(slot),
                        Command::Quit => false,
                    };
                    coordinator.pump();
                    dirty = accepted;
                }
                None => print_help_line(),
            },
        }

        if coordinator.engine().status() == GameStatus::Completed {
            coordinator.pump();
            if let Some(record) = coordinator.last_record() {
                print!("\n{}", render_report(record));
            }
            return Ok(());
        }
    }
}
