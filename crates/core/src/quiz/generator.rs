use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{QuizQuestion, VocabularyItem, validate_items};
use crate::rng::{RandomSource, shuffle};

/// Options per question when the lesson has enough distinct meanings.
pub const DEFAULT_OPTION_COUNT: usize = 4;

/// Order in which generated questions are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionOrder {
    /// Same order as the lesson's vocabulary.
    #[default]
    Lesson,
    /// Uniform random permutation drawn from the same random source.
    Shuffled,
}

/// Knobs for [`generate_questions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    option_count: usize,
    order: QuestionOrder,
    filler: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            option_count: DEFAULT_OPTION_COUNT,
            order: QuestionOrder::Lesson,
            filler: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn with_order(mut self, order: QuestionOrder) -> Self {
        self.order = order;
        self
    }

    /// Total options per question, correct answer included.
    #[must_use]
    pub fn with_option_count(mut self, count: usize) -> Self {
        self.option_count = count;
        self
    }

    /// Extra meanings used to pad questions when the lesson itself has too few
    /// distinct distractors. Without filler, small lessons get fewer options.
    #[must_use]
    pub fn with_filler<I, S>(mut self, filler: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filler = filler.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.option_count
    }

    #[must_use]
    pub fn order(&self) -> QuestionOrder {
        self.order
    }
}

/// Distinct strings from `candidates`, in first-seen order, skipping anything in `exclude`.
fn distinct_excluding<'a>(
    candidates: impl IntoIterator<Item = &'a str>,
    exclude: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !exclude.contains(c) && seen.insert(*c))
        .collect()
}

fn sample<'a, R: RandomSource + ?Sized>(
    rng: &mut R,
    pool: &[&'a str],
    amount: usize,
) -> Vec<&'a str> {
    rng.choose_distinct(pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}

fn build_question<R: RandomSource + ?Sized>(
    item: &VocabularyItem,
    items: &[VocabularyItem],
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<QuizQuestion, ValidationError> {
    let wanted = config.option_count - 1;
    let mut exclude: HashSet<&str> = HashSet::from([item.meaning()]);

    let pool = distinct_excluding(
        items
            .iter()
            .filter(|other| other.id() != item.id())
            .map(VocabularyItem::meaning),
        &exclude,
    );
    let mut distractors = sample(rng, &pool, wanted);

    if distractors.len() < wanted && !config.filler.is_empty() {
        exclude.extend(distractors.iter().copied());
        let filler = distinct_excluding(config.filler.iter().map(String::as_str), &exclude);
        let padding = sample(rng, &filler, wanted - distractors.len());
        distractors.extend(padding);
    }

    let mut options: Vec<String> = distractors.into_iter().map(str::to_owned).collect();
    options.push(item.meaning().to_owned());
    shuffle(rng, &mut options);

    QuizQuestion::new(item.clone(), options)
}

/// Turn a lesson's vocabulary into one multiple-choice question per item.
///
/// Each question offers the item's meaning plus up to `option_count - 1`
/// distractors sampled without replacement from the other items' distinct
/// meanings, in a uniformly shuffled order. Output is fully determined by the
/// random source, so a seeded source reproduces the same quiz.
///
/// # Errors
///
/// Returns `ValidationError` if `items` is empty, has duplicate ids or blank
/// meanings, or if the configured option count is zero.
pub fn generate_questions<R: RandomSource + ?Sized>(
    items: &[VocabularyItem],
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Vec<QuizQuestion>, ValidationError> {
    validate_items(items)?;
    if config.option_count == 0 {
        return Err(ValidationError::InvalidOptionCount { count: 0 });
    }

    let mut questions = items
        .iter()
        .map(|item| build_question(item, items, config, rng))
        .collect::<Result<Vec<_>, _>>()?;

    if config.order == QuestionOrder::Shuffled {
        shuffle(rng, &mut questions);
    }

    Ok(questions)
}
