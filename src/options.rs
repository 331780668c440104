use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// At most this many distractors make it onto a quiz.
pub const MAX_DISTRACTORS: usize = 3;

/// Build the option list for a multiple choice question.
///
/// The answer always comes first before the shuffle, so when a distractor
/// duplicates the answer the answer wins and the list just gets shorter.
pub fn build_options<R, S>(answer: &str, distractors: &[S], rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
    S: AsRef<str>,
{
    let mut options: Vec<String> = std::iter::once(answer)
        .chain(
            distractors
                .iter()
                .take(MAX_DISTRACTORS)
                .map(AsRef::as_ref),
        )
        .unique()
        .map(str::to_owned)
        .collect();
    options.shuffle(rng);
    options
}
