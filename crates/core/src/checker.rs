//! Answer equivalence checking.

use thiserror::Error;

use crate::model::{GameMode, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerParseError {
    #[error("answer cannot be empty")]
    Empty,

    #[error("answer is not a whole number: {0}")]
    NotANumber(String),
}

/// A learner's submission after input validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub num: i64,
    pub den: Option<i64>,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn new(num: i64, den: Option<i64>) -> Self {
        Self { num, den }
    }

    /// Parse raw input fields.
    ///
    /// The numerator must be an integer. A blank or unparsable denominator is
    /// treated as absent, which the checker grades as wrong for fraction answers.
    ///
    /// # Errors
    ///
    /// Returns `AnswerParseError` if the numerator is blank or not an integer.
    pub fn parse(num: &str, den: Option<&str>) -> Result<Self, AnswerParseError> {
        let num = num.trim();
        if num.is_empty() {
            return Err(AnswerParseError::Empty);
        }
        let num = num
            .parse::<i64>()
            .map_err(|_| AnswerParseError::NotANumber(num.to_owned()))?;
        let den = den.and_then(|d| d.trim().parse::<i64>().ok());
        Ok(Self { num, den })
    }

    /// How the answer is recorded in history for the given mode.
    #[must_use]
    pub fn render(&self, mode: GameMode) -> String {
        if !mode.expects_fraction() {
            return self.num.to_string();
        }
        match self.den {
            Some(den) => format!("{}/{den}", self.num),
            None => format!("{}/", self.num),
        }
    }
}

/// Grades submissions against a question's canonical answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerChecker;

impl AnswerChecker {
    /// Whole-number answers must match exactly; the denominator is ignored.
    /// Fraction answers accept any equivalent fraction (`2/4` for `1/2`) and
    /// fail closed on a missing or zero denominator.
    #[must_use]
    pub fn check(question: &Question, num: i64, den: Option<i64>) -> bool {
        let answer = question.answer();
        match answer.den {
            None => num == answer.num,
            Some(answer_den) => match den {
                None | Some(0) => false,
                Some(den) => {
                    i128::from(num) * i128::from(answer_den)
                        == i128::from(answer.num) * i128::from(den)
                }
            },
        }
    }

    #[must_use]
    pub fn check_submission(question: &Question, submission: SubmittedAnswer) -> bool {
        Self::check(question, submission.num, submission.den)
    }
}
