use chrono::{DateTime, Utc};

use crate::model::{GameMode, GameResult, HistoryEntry};

/// Folds a session's history into its final `GameResult`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// `score` is the number of correct main-round attempts.
    #[must_use]
    pub fn aggregate(
        history: Vec<HistoryEntry>,
        total_questions: usize,
        mode: GameMode,
        retry_attempts: u32,
        completed: bool,
        date: DateTime<Utc>,
    ) -> GameResult {
        let score = history.iter().filter(|h| h.is_correct).count();
        let score = u32::try_from(score).unwrap_or(u32::MAX);
        let total = u32::try_from(total_questions).unwrap_or(u32::MAX);
        GameResult::new(
            score.min(total),
            total,
            date,
            mode,
            retry_attempts,
            completed,
            history,
        )
    }
}
