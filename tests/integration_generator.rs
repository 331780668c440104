// Queue-level properties of the challenge generator over bundled and
// synthetic courses.

use std::collections::HashSet;

use itertools::Itertools;
use pinyin_match::{
    catalog::Catalog,
    challenge::Challenge,
    generator::{ChallengeGenerator, GeneratorConfig},
    item::{FillItem, Item, Term},
    options::build_options,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn generator(quiz_probability: f64) -> ChallengeGenerator {
    ChallengeGenerator::new(GeneratorConfig { quiz_probability })
}

fn check_queue(queue: &[Challenge]) {
    for challenge in queue {
        match challenge {
            Challenge::Quiz(quiz) => {
                assert!(quiz.options.contains(&quiz.answer), "{quiz:?}");
                assert!(quiz.options.len() <= 4);
                assert!(quiz.options.iter().all_unique());
            }
            Challenge::Match(m) => {
                assert!(m.pairs.iter().map(|p| &p.question).all_unique(), "{m:?}");
                assert!(m.pairs.iter().map(|p| &p.answer).all_unique(), "{m:?}");
            }
            Challenge::Fill(_) => {}
        }
    }
}

#[test]
fn bundled_courses_generate_valid_queues() {
    let catalog = Catalog::load_course_catalog().unwrap();
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        for course in catalog.courses() {
            let queue = generator(0.5).generate(&course.items, &mut rng);
            assert!(!queue.is_empty(), "{} produced nothing", course.id);
            let covered: usize = queue.iter().map(Challenge::question_count).sum();
            assert_eq!(covered, course.question_count(), "{}", course.id);
            check_queue(&queue);
        }
    }
}

#[test]
fn duplicate_heavy_pool_keeps_chunks_unique() {
    let items: Vec<Item> = (0..24)
        .map(|i| {
            Item::Default(Term::new(
                format!("字{}", i % 5),
                format!("zì{}", i % 3),
                1,
            ))
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(11);
    let queue = generator(0.0).generate(&items, &mut rng);
    check_queue(&queue);
    let covered: usize = queue.iter().map(Challenge::question_count).sum();
    assert_eq!(covered, items.len());
}

#[test]
fn four_quiz_capable_defaults_become_one_match_when_quizzes_are_off() {
    let items: Vec<Item> = [("八", "bā"), ("爬", "pá"), ("马", "mǎ"), ("大", "dà")]
        .iter()
        .map(|(q, a)| Item::Default(Term::new(*q, *a, 1).with_options(["x", "y", "z"])))
        .collect();
    let mut rng = StdRng::seed_from_u64(5);
    let queue = generator(0.0).generate(&items, &mut rng);

    assert_eq!(queue.len(), 1);
    let Challenge::Match(m) = &queue[0] else {
        panic!("expected a match, got {:?}", queue[0]);
    };
    assert_eq!(m.pairs.len(), 4);
    check_queue(&queue);
}

#[test]
fn options_for_ba_are_exactly_answer_and_distractors() {
    let mut rng = StdRng::seed_from_u64(1);
    let options = build_options("bā", &["pā", "bá", "dā"], &mut rng);
    assert_eq!(options.len(), 4);
    let got: HashSet<&str> = options.iter().map(String::as_str).collect();
    assert_eq!(got, HashSet::from(["bā", "pā", "bá", "dā"]));
}

#[test]
fn fill_accepts_only_the_exact_answer_sequence() {
    let item = Item::Fill(FillItem {
        question: "我 __ 学 __".into(),
        answers: vec!["上".into(), "了".into()],
        options: vec!["上".into(), "了".into(), "下".into()],
        level: 2,
    });
    let mut rng = StdRng::seed_from_u64(0);
    let queue = generator(0.2).generate(&[item], &mut rng);
    let Some(Challenge::Fill(fill)) = queue.first() else {
        panic!("expected a fill challenge");
    };
    assert!(fill.is_solved_by(&["上", "了"]));
    assert!(!fill.is_solved_by(&["下", "了"]));
    assert!(!fill.is_solved_by(&["上", "下"]));
    assert!(!fill.is_solved_by(&["了", "上"]));
}
