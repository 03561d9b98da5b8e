use math_core::model::Question;

use super::machine::{Feedback, SessionPhase};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    /// 1-based position in the current round.
    pub position: usize,
    /// Main-round question count, or retry queue length during retries.
    pub total: usize,
    /// Main-round answers recorded so far.
    pub answered: usize,
    pub retry_attempts: u32,
    pub remaining_secs: Option<u32>,
    pub feedback: Option<Feedback>,
    pub help_open: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self.phase, SessionPhase::RetryIntro | SessionPhase::RetryRound)
    }
}

/// Everything the presentation side needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub question: Option<Question>,
    pub progress: SessionProgress,
    /// Seconds since the current question was shown.
    pub question_elapsed_secs: f64,
}
