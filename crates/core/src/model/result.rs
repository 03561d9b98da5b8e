use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::{GameMode, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameResultError {
    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("history has {history} entries but only {total} questions")]
    HistoryTooLong { history: usize, total: u32 },
}

/// One main-round attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
    /// Seconds between presentation and submission.
    pub time_taken: f64,
}

/// Coarse grading of a result for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Perfect,
    Great,
    Good,
    KeepPracticing,
}

impl ScoreBand {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            100.. => ScoreBand::Perfect,
            80..=99 => ScoreBand::Great,
            50..=79 => ScoreBand::Good,
            _ => ScoreBand::KeepPracticing,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ScoreBand::Perfect => "PERFECT!",
            ScoreBand::Great => "Great Job!",
            ScoreBand::Good => "Good Practice!",
            ScoreBand::KeepPracticing => "Keep Practicing!",
        }
    }
}

/// Terminal record of a session, handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    student_name: Option<String>,
    score: u32,
    total_questions: u32,
    date: DateTime<Utc>,
    mode: GameMode,
    retry_count: u32,
    completed: bool,
    history: Vec<HistoryEntry>,
}

impl GameResult {
    pub(crate) fn new(
        score: u32,
        total_questions: u32,
        date: DateTime<Utc>,
        mode: GameMode,
        retry_count: u32,
        completed: bool,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            student_name: None,
            score,
            total_questions,
            date,
            mode,
            retry_count,
            completed,
            history,
        }
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `GameResultError` when the counts contradict each other.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        student_name: Option<String>,
        score: u32,
        total_questions: u32,
        date: DateTime<Utc>,
        mode: GameMode,
        retry_count: u32,
        completed: bool,
        history: Vec<HistoryEntry>,
    ) -> Result<Self, GameResultError> {
        if score > total_questions {
            return Err(GameResultError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        if history.len() > total_questions as usize {
            return Err(GameResultError::HistoryTooLong {
                history: history.len(),
                total: total_questions,
            });
        }
        Ok(Self {
            student_name,
            score,
            total_questions,
            date,
            mode,
            retry_count,
            completed,
            history,
        })
    }

    #[must_use]
    pub fn with_student_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.student_name = if name.trim().is_empty() {
            None
        } else {
            Some(name.trim().to_owned())
        };
        self
    }

    #[must_use]
    pub fn student_name(&self) -> Option<&str> {
        self.student_name.as_deref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Questions generated but never attempted (time ran out or the learner left).
    #[must_use]
    pub fn unanswered(&self) -> u32 {
        let attempted = u32::try_from(self.history.len()).unwrap_or(u32::MAX);
        self.total_questions.saturating_sub(attempted)
    }

    #[must_use]
    pub fn wrong_answers(&self) -> usize {
        self.history.iter().filter(|h| !h.is_correct).count()
    }

    /// Rounded share of `total_questions` answered correctly first time.
    ///
    /// Unanswered questions count against the learner.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        let scaled = u64::from(self.score) * 200 + u64::from(self.total_questions);
        let pct = scaled / (2 * u64::from(self.total_questions));
        u32::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage())
    }
}
