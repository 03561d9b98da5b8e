//! Question synthesis with bounded duplicate avoidance.

use rand::Rng;
use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::model::{GameMode, GameSettings, Question};
use crate::numbers::{gcd, pick, random_int};

/// Most times a single signature may appear in one batch.
pub const MAX_PER_SIGNATURE: usize = 2;

/// Candidate attempts allowed per requested question.
pub const ATTEMPTS_PER_QUESTION: usize = 10;

/// Numerator draws per mixed-number candidate before giving up on it.
const NUMERATOR_DRAWS: usize = 8;

/// Produces a batch of questions for a round.
///
/// Generation stops at `question_count` accepted questions or after
/// `question_count * attempts_per_question` candidates, whichever comes
/// first. A configuration too narrow to fill the batch yields a shorter one.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionGenerator;

#[derive(Debug, Default)]
struct Batch {
    accepted: Vec<Question>,
    seen: HashMap<String, usize>,
}

impl Batch {
    fn offer(mut self, candidate: Option<Question>) -> Self {
        let Some(question) = candidate else {
            return self;
        };
        let count = self.seen.entry(question.signature()).or_insert(0);
        if *count < MAX_PER_SIGNATURE {
            *count += 1;
            self.accepted.push(question);
        }
        self
    }
}

impl QuestionGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Candidate budget for the given settings.
    #[must_use]
    pub fn attempt_budget(&self, settings: &GameSettings) -> usize {
        settings
            .question_count
            .saturating_mul(ATTEMPTS_PER_QUESTION)
    }

    /// Generate using the thread-local RNG.
    #[must_use]
    pub fn generate(&self, settings: &GameSettings) -> Vec<Question> {
        self.generate_with(settings, &mut rand::rng())
    }

    /// Generate with a caller-supplied RNG. Never returns more than
    /// `settings.question_count` questions.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        settings: &GameSettings,
        rng: &mut R,
    ) -> Vec<Question> {
        let target = settings.question_count;

        let folded = (0..self.attempt_budget(settings)).try_fold(Batch::default(), |batch, _| {
            if batch.accepted.len() >= target {
                return ControlFlow::Break(batch);
            }
            ControlFlow::Continue(batch.offer(synthesize(settings, rng)))
        });

        let (ControlFlow::Break(batch) | ControlFlow::Continue(batch)) = folded;
        batch.accepted
    }
}

fn synthesize<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Option<Question> {
    match settings.mode {
        GameMode::TimesTables => times_table(settings, rng),
        GameMode::FractionsOps => fraction_op(settings, rng),
        GameMode::MixedToImproper => mixed_to_improper(settings, rng),
    }
}

fn times_table<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Option<Question> {
    let tables = settings.tables();
    let table = *pick(rng, &tables)?;
    let multiplier = random_int(rng, 1, 12);
    Some(Question::times_table(table, multiplier))
}

fn fraction_op<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Option<Question> {
    let ops = settings.ops();
    let op = *pick(rng, &ops)?;
    let dens = settings.denominators();
    let den = *pick(rng, &dens)?;
    let n1 = random_int(rng, 1, den - 1);
    let n2 = random_int(rng, 1, den - 1);
    Question::fraction_op(n1, n2, den, op).ok()
}

fn mixed_to_improper<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Option<Question> {
    let whole = random_int(rng, 1, settings.max_whole());
    let dens = settings.denominators();
    let den = *pick(rng, &dens)?;
    // Proper part in lowest terms keeps the improper answer in lowest terms too.
    let num = (0..NUMERATOR_DRAWS)
        .map(|_| random_int(rng, 1, den - 1))
        .find(|&n| gcd(n, den) == 1)?;
    Question::mixed_to_improper(whole, num, den).ok()
}
