use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;

use math_core::model::{GameMode, GameResult, GameSettings, HistoryEntry, Question, QuestionId};
use math_core::{AnswerChecker, Clock, QuestionGenerator, ResultAggregator, SubmittedAnswer};

use super::progress::{SessionProgress, SessionSnapshot};
use crate::error::SessionError;

//
// ─── STATES AND OUTCOMES ───────────────────────────────────────────────────────
//

/// Where a session currently is.
///
/// `MainRound → RetryIntro → RetryRound → Finished`, with `RetryIntro`
/// skipped when the main round had no mistakes. `Abandoned` is reachable
/// from any non-terminal phase through `exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    MainRound,
    RetryIntro,
    RetryRound,
    Finished,
    Abandoned,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Finished | SessionPhase::Abandoned)
    }
}

/// Feedback held on screen after a submission until `advance` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Wrong,
}

/// Why the main round stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    AllAnswered,
    TimedOut,
}

/// Result of a one-second timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown is not running (untimed, paused, or not in the main round).
    Ignored,
    Counted { remaining: u32 },
    /// Time ran out and the main round was closed.
    Expired,
}

/// What happened to a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    /// Phase the submission was made in.
    pub phase: SessionPhase,
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// Synchronous state machine for one learner's round.
///
/// The machine never sleeps or spawns. Feedback display is modelled as a
/// pending state cleared by `advance`, and the countdown only moves through
/// `tick`, which is a no-op while feedback is pending or help is open.
pub struct SessionMachine {
    mode: GameMode,
    clock: Clock,
    student_name: Option<String>,
    questions: Vec<Question>,
    phase: SessionPhase,
    index: usize,
    retry_queue: Vec<usize>,
    retry_index: usize,
    retry_attempts: u32,
    history: Vec<HistoryEntry>,
    feedback: Option<Feedback>,
    help_open: bool,
    remaining_secs: Option<u32>,
    round_end: Option<RoundEnd>,
    presented_at: DateTime<Utc>,
    result: Option<GameResult>,
    result_taken: bool,
}

impl SessionMachine {
    /// Validate settings, generate the question set once, and enter the main round.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Settings` for invalid settings and
    /// `SessionError::Empty` if nothing could be generated.
    pub fn start<R: Rng + ?Sized>(
        settings: &GameSettings,
        generator: &QuestionGenerator,
        rng: &mut R,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        settings.validate()?;
        let questions = generator.generate_with(settings, rng);
        if questions.len() < settings.question_count {
            tracing::warn!(
                requested = settings.question_count,
                generated = questions.len(),
                mode = %settings.mode,
                "question budget exhausted before reaching requested count"
            );
        }
        Self::new(settings, questions, clock)
    }

    /// Enter the main round with an already generated question set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub fn new(
        settings: &GameSettings,
        questions: Vec<Question>,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let now = clock.now();
        Ok(Self {
            mode: settings.mode,
            clock,
            student_name: None,
            questions,
            phase: SessionPhase::MainRound,
            index: 0,
            retry_queue: Vec::new(),
            retry_index: 0,
            retry_attempts: 0,
            history: Vec::new(),
            feedback: None,
            help_open: false,
            remaining_secs: settings.is_timed().then_some(settings.time_limit_seconds),
            round_end: None,
            presented_at: now,
            result: None,
            result_taken: false,
        })
    }

    #[must_use]
    pub fn with_student_name(mut self, name: Option<String>) -> Self {
        self.student_name = name;
        self
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    #[must_use]
    pub fn help_open(&self) -> bool {
        self.help_open
    }

    #[must_use]
    pub fn round_end(&self) -> Option<RoundEnd> {
        self.round_end
    }

    #[must_use]
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Questions waiting in the retry phase, in original attempt order.
    #[must_use]
    pub fn retry_queue(&self) -> Vec<&Question> {
        self.retry_queue
            .iter()
            .filter_map(|&i| self.questions.get(i))
            .collect()
    }

    /// The question currently on screen, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::MainRound => self.questions.get(self.index),
            SessionPhase::RetryRound => self
                .retry_queue
                .get(self.retry_index)
                .and_then(|&i| self.questions.get(i)),
            SessionPhase::RetryIntro | SessionPhase::Finished | SessionPhase::Abandoned => None,
        }
    }

    /// Whether a tick would currently move the countdown.
    #[must_use]
    pub fn countdown_running(&self) -> bool {
        self.phase == SessionPhase::MainRound
            && self.feedback.is_none()
            && !self.help_open
            && self.remaining_secs.is_some_and(|s| s > 0)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let (position, total) = match self.phase {
            SessionPhase::RetryIntro | SessionPhase::RetryRound => {
                (self.retry_index + 1, self.retry_queue.len())
            }
            SessionPhase::MainRound => (self.index + 1, self.questions.len()),
            SessionPhase::Finished | SessionPhase::Abandoned => {
                (self.questions.len(), self.questions.len())
            }
        };
        SessionProgress {
            phase: self.phase,
            position: position.min(total),
            total,
            answered: self.history.len(),
            retry_attempts: self.retry_attempts,
            remaining_secs: self.remaining_secs,
            feedback: self.feedback,
            help_open: self.help_open,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            question: self.current_question().cloned(),
            progress: self.progress(),
            question_elapsed_secs: self.clock.seconds_since(self.presented_at),
        }
    }

    /// Final record, once the session is `Finished` or `Abandoned`.
    #[must_use]
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Hands out the final record exactly once, for persistence.
    pub fn take_unsaved_result(&mut self) -> Option<GameResult> {
        if self.result_taken {
            return None;
        }
        let result = self.result.clone()?;
        self.result_taken = true;
        Some(result)
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    /// Grade an answer for the current question and hold feedback.
    ///
    /// In the main round every submission is appended to history. In the
    /// retry round a wrong answer bumps the session-wide retry counter and
    /// the same question comes back after `advance`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AwaitingFeedback` if the previous answer has not
    /// been acknowledged, or `SessionError::WrongPhase` outside a round.
    pub fn submit(&mut self, answer: SubmittedAnswer) -> Result<SubmissionOutcome, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::Completed);
        }
        if self.feedback.is_some() {
            return Err(SessionError::AwaitingFeedback);
        }
        let question = self
            .current_question()
            .ok_or(SessionError::WrongPhase(self.phase))?
            .clone();
        let is_correct = AnswerChecker::check_submission(&question, answer);

        match self.phase {
            SessionPhase::MainRound => {
                self.history.push(HistoryEntry {
                    user_answer: answer.render(question.mode()),
                    is_correct,
                    time_taken: self.clock.seconds_since(self.presented_at),
                    question: question.clone(),
                });
            }
            SessionPhase::RetryRound => {
                if !is_correct {
                    self.retry_attempts = self.retry_attempts.saturating_add(1);
                }
            }
            other => return Err(SessionError::WrongPhase(other)),
        }

        self.feedback = Some(if is_correct {
            Feedback::Correct
        } else {
            Feedback::Wrong
        });

        Ok(SubmissionOutcome {
            question_id: question.id(),
            is_correct,
            phase: self.phase,
        })
    }

    /// Clear feedback and move on.
    ///
    /// Main round: next question, or close the round after the last one.
    /// Retry round: next queued question after a correct fix (finishing after
    /// the last), or the same question again after a wrong one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingFeedback` if nothing was submitted.
    pub fn advance(&mut self) -> Result<SessionPhase, SessionError> {
        let feedback = self.feedback.take().ok_or(SessionError::NoPendingFeedback)?;
        self.presented_at = self.clock.now();

        match self.phase {
            SessionPhase::MainRound => {
                self.index += 1;
                if self.index >= self.questions.len() {
                    self.end_main_round(RoundEnd::AllAnswered);
                }
            }
            SessionPhase::RetryRound => {
                if feedback == Feedback::Correct {
                    self.retry_index += 1;
                    if self.retry_index >= self.retry_queue.len() {
                        self.finish();
                    }
                }
            }
            // Feedback is only set by `submit`, which refuses these phases.
            SessionPhase::RetryIntro | SessionPhase::Finished | SessionPhase::Abandoned => {}
        }

        Ok(self.phase)
    }

    /// One elapsed second of the round timer.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.countdown_running() {
            return TickOutcome::Ignored;
        }
        let Some(remaining) = self.remaining_secs.as_mut() else {
            return TickOutcome::Ignored;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return TickOutcome::Counted {
                remaining: *remaining,
            };
        }
        self.end_main_round(RoundEnd::TimedOut);
        TickOutcome::Expired
    }

    /// Open the help panel for the current question; pauses the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` when no question is on screen.
    pub fn request_help(&mut self) -> Result<Question, SessionError> {
        let question = self
            .current_question()
            .ok_or(SessionError::WrongPhase(self.phase))?
            .clone();
        self.help_open = true;
        Ok(question)
    }

    pub fn close_help(&mut self) {
        self.help_open = false;
    }

    /// Leave the retry introduction and start fixing mistakes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `RetryIntro`.
    pub fn proceed_to_retry(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::RetryIntro {
            return Err(SessionError::WrongPhase(self.phase));
        }
        self.retry_queue = self
            .history
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_correct)
            .filter_map(|(_, entry)| {
                self.questions
                    .iter()
                    .position(|q| q.id() == entry.question.id())
            })
            .collect();
        self.retry_index = 0;
        self.help_open = false;
        self.presented_at = self.clock.now();
        self.phase = SessionPhase::RetryRound;
        tracing::info!(queued = self.retry_queue.len(), "retry round started");
        Ok(())
    }

    /// Abandon the session, producing an incomplete result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already ended.
    pub fn exit(&mut self) -> Result<&GameResult, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::Completed);
        }
        self.feedback = None;
        self.help_open = false;
        self.phase = SessionPhase::Abandoned;
        let result = self.build_result(false);
        tracing::info!(
            answered = self.history.len(),
            retry_attempts = self.retry_attempts,
            "session abandoned"
        );
        Ok(self.result.insert(result))
    }

    fn end_main_round(&mut self, reason: RoundEnd) {
        self.round_end = Some(reason);
        self.help_open = false;
        let wrong = self.history.iter().filter(|h| !h.is_correct).count();
        tracing::info!(
            ?reason,
            answered = self.history.len(),
            wrong,
            "main round ended"
        );
        if wrong > 0 {
            self.phase = SessionPhase::RetryIntro;
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = SessionPhase::Finished;
        let result = self.build_result(true);
        tracing::info!(
            score = result.score(),
            total = result.total_questions(),
            retry_count = result.retry_count(),
            "session finished"
        );
        self.result = Some(result);
    }

    fn build_result(&self, completed: bool) -> GameResult {
        let result = ResultAggregator::aggregate(
            self.history.clone(),
            self.questions.len(),
            self.mode,
            self.retry_attempts,
            completed,
            self.clock.now(),
        );
        match &self.student_name {
            Some(name) => result.with_student_name(name.clone()),
            None => result,
        }
    }
}

impl fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMachine")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("index", &self.index)
            .field("history_len", &self.history.len())
            .field("retry_index", &self.retry_index)
            .field("retry_attempts", &self.retry_attempts)
            .field("remaining_secs", &self.remaining_secs)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use math_core::model::FractionOp;
    use math_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn times_settings(count: usize) -> GameSettings {
        GameSettings::default_for(GameMode::TimesTables).with_question_count(count)
    }

    fn fixed_questions(pairs: &[(i64, i64)]) -> Vec<Question> {
        pairs
            .iter()
            .map(|&(a, b)| Question::times_table(a, b))
            .collect()
    }

    fn machine(pairs: &[(i64, i64)]) -> SessionMachine {
        SessionMachine::new(&times_settings(pairs.len()), fixed_questions(pairs), fixed_clock())
            .unwrap()
    }

    fn answer_current(m: &mut SessionMachine, correct: bool) -> SessionPhase {
        let expected = m.current_question().unwrap().answer().num;
        let given = if correct { expected } else { expected + 1 };
        m.submit(SubmittedAnswer::new(given, None)).unwrap();
        m.advance().unwrap()
    }

    #[test]
    fn empty_question_set_is_rejected() {
        let err = SessionMachine::new(&times_settings(3), Vec::new(), fixed_clock()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn start_generates_once_and_enters_main_round() {
        let mut rng = StdRng::seed_from_u64(9);
        let m = SessionMachine::start(
            &times_settings(6),
            &QuestionGenerator::new(),
            &mut rng,
            fixed_clock(),
        )
        .unwrap();
        assert_eq!(m.phase(), SessionPhase::MainRound);
        assert_eq!(m.questions().len(), 6);
        assert_eq!(m.progress().position, 1);
    }

    #[test]
    fn start_rejects_invalid_settings() {
        let mut rng = StdRng::seed_from_u64(9);
        let err = SessionMachine::start(
            &times_settings(0),
            &QuestionGenerator::new(),
            &mut rng,
            fixed_clock(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Settings(_)));
    }

    #[test]
    fn all_correct_goes_straight_to_finished() {
        let mut m = machine(&[(2, 3), (4, 5), (6, 7), (8, 9), (10, 11)]);
        for _ in 0..4 {
            assert_eq!(answer_current(&mut m, true), SessionPhase::MainRound);
        }
        assert_eq!(answer_current(&mut m, true), SessionPhase::Finished);

        let result = m.result().unwrap();
        assert_eq!(result.score(), 5);
        assert_eq!(result.total_questions(), 5);
        assert_eq!(result.retry_count(), 0);
        assert!(result.completed());
        assert_eq!(m.round_end(), Some(RoundEnd::AllAnswered));
    }

    #[test]
    fn wrong_answers_queue_retries_in_attempt_order() {
        let mut m = machine(&[(2, 3), (2, 4), (3, 3), (3, 4)]);
        answer_current(&mut m, false);
        answer_current(&mut m, false);
        answer_current(&mut m, true);
        assert_eq!(answer_current(&mut m, true), SessionPhase::RetryIntro);

        assert_eq!(m.history().len(), 4);
        assert_eq!(m.history().iter().filter(|h| !h.is_correct).count(), 2);
        assert!(m.current_question().is_none());

        m.proceed_to_retry().unwrap();
        let queue: Vec<i64> = m.retry_queue().iter().map(|q| q.answer().num).collect();
        assert_eq!(queue, vec![6, 8]);
        assert_eq!(m.current_question().unwrap().answer().num, 6);

        assert_eq!(answer_current(&mut m, true), SessionPhase::RetryRound);
        assert_eq!(answer_current(&mut m, true), SessionPhase::Finished);

        let result = m.result().unwrap();
        assert_eq!(result.score(), 2);
        assert_eq!(result.total_questions(), 4);
        assert_eq!(result.retry_count(), 0);
        assert!(result.completed());
        assert_eq!(result.history().len(), 4);
    }

    #[test]
    fn retry_reuses_the_same_question_objects() {
        let mut m = machine(&[(5, 5), (6, 6)]);
        let first_id = m.questions()[0].id();
        answer_current(&mut m, false);
        answer_current(&mut m, true);
        m.proceed_to_retry().unwrap();
        assert_eq!(m.current_question().unwrap().id(), first_id);
    }

    #[test]
    fn failed_fixes_count_every_attempt() {
        let mut m = machine(&[(7, 7), (8, 8)]);
        answer_current(&mut m, false);
        answer_current(&mut m, true);
        m.proceed_to_retry().unwrap();

        let id = m.current_question().unwrap().id();
        assert_eq!(answer_current(&mut m, false), SessionPhase::RetryRound);
        assert_eq!(m.current_question().unwrap().id(), id);
        assert_eq!(answer_current(&mut m, false), SessionPhase::RetryRound);
        assert_eq!(m.retry_attempts(), 2);
        assert_eq!(answer_current(&mut m, true), SessionPhase::Finished);

        let result = m.result().unwrap();
        assert_eq!(result.retry_count(), 2);
        assert!(result.completed());
        // Retry attempts never reach the main-round history.
        assert_eq!(result.history().len(), 2);
    }

    #[test]
    fn submit_requires_acknowledged_feedback() {
        let mut m = machine(&[(2, 2), (3, 3)]);
        m.submit(SubmittedAnswer::new(4, None)).unwrap();
        let err = m.submit(SubmittedAnswer::new(9, None)).unwrap_err();
        assert!(matches!(err, SessionError::AwaitingFeedback));
        assert_eq!(m.feedback(), Some(Feedback::Correct));
        assert!(matches!(
            machine(&[(2, 2)]).advance(),
            Err(SessionError::NoPendingFeedback)
        ));
    }

    #[test]
    fn retry_intro_rejects_answers_and_other_phases_reject_proceed() {
        let mut m = machine(&[(2, 2)]);
        assert!(matches!(
            m.proceed_to_retry(),
            Err(SessionError::WrongPhase(SessionPhase::MainRound))
        ));
        answer_current(&mut m, false);
        assert!(matches!(
            m.submit(SubmittedAnswer::new(4, None)),
            Err(SessionError::WrongPhase(SessionPhase::RetryIntro))
        ));
    }

    #[test]
    fn timeout_ends_round_with_partial_history() {
        let settings = times_settings(10).with_time_limit(30);
        let questions = fixed_questions(&[(2, 1); 10]);
        let mut m = SessionMachine::new(&settings, questions, fixed_clock()).unwrap();

        answer_current(&mut m, true);
        answer_current(&mut m, true);
        for expected in (1..30).rev() {
            assert_eq!(m.tick(), TickOutcome::Counted { remaining: expected });
        }
        assert_eq!(m.tick(), TickOutcome::Expired);
        assert_eq!(m.phase(), SessionPhase::Finished);
        assert_eq!(m.round_end(), Some(RoundEnd::TimedOut));

        let result = m.result().unwrap();
        assert_eq!(result.total_questions(), 10);
        assert_eq!(result.history().len(), 2);
        assert_eq!(result.score(), 2);
        assert_eq!(result.unanswered(), 8);
        assert_eq!(m.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn timeout_with_mistakes_goes_to_retry_intro_without_unanswered() {
        let settings = times_settings(5).with_time_limit(2);
        let mut m = SessionMachine::new(&settings, fixed_questions(&[(3, 3); 5]), fixed_clock())
            .unwrap();
        answer_current(&mut m, false);
        m.tick();
        assert_eq!(m.tick(), TickOutcome::Expired);
        assert_eq!(m.phase(), SessionPhase::RetryIntro);
        m.proceed_to_retry().unwrap();
        assert_eq!(m.retry_queue().len(), 1);
        assert_eq!(m.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn countdown_pauses_for_feedback_and_help() {
        let settings = times_settings(2).with_time_limit(10);
        let mut m =
            SessionMachine::new(&settings, fixed_questions(&[(4, 4), (5, 5)]), fixed_clock())
                .unwrap();

        m.submit(SubmittedAnswer::new(16, None)).unwrap();
        assert_eq!(m.tick(), TickOutcome::Ignored);
        m.advance().unwrap();

        m.request_help().unwrap();
        assert!(m.help_open());
        assert_eq!(m.tick(), TickOutcome::Ignored);
        m.close_help();
        assert_eq!(m.tick(), TickOutcome::Counted { remaining: 9 });
    }

    #[test]
    fn untimed_rounds_ignore_ticks() {
        let mut m = machine(&[(2, 2)]);
        assert_eq!(m.remaining_secs(), None);
        assert_eq!(m.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn exit_mid_retry_keeps_accumulated_state() {
        let mut m = machine(&[(9, 9), (9, 8)]);
        answer_current(&mut m, false);
        answer_current(&mut m, false);
        m.proceed_to_retry().unwrap();
        answer_current(&mut m, false);

        let result = m.exit().unwrap().clone();
        assert_eq!(m.phase(), SessionPhase::Abandoned);
        assert!(!result.completed());
        assert_eq!(result.retry_count(), 1);
        assert_eq!(result.history().len(), 2);
        assert_eq!(result.score(), 0);

        assert!(matches!(m.exit(), Err(SessionError::Completed)));
        assert!(matches!(
            m.submit(SubmittedAnswer::new(81, None)),
            Err(SessionError::Completed)
        ));
    }

    #[test]
    fn exit_from_main_round_and_retry_intro() {
        let mut m = machine(&[(2, 2), (3, 3)]);
        answer_current(&mut m, true);
        assert!(!m.exit().unwrap().completed());

        let mut m = machine(&[(2, 2)]);
        answer_current(&mut m, false);
        assert_eq!(m.phase(), SessionPhase::RetryIntro);
        let result = m.exit().unwrap();
        assert_eq!(result.history().len(), 1);
    }

    #[test]
    fn result_is_handed_out_once() {
        let mut m = machine(&[(2, 2)]);
        answer_current(&mut m, true);
        assert!(m.take_unsaved_result().is_some());
        assert!(m.take_unsaved_result().is_none());
        assert!(m.result().is_some());
    }

    #[test]
    fn history_records_answer_text_and_time_taken() {
        let settings = GameSettings::default_for(GameMode::FractionsOps).with_question_count(1);
        let q = Question::fraction_op(1, 1, 4, FractionOp::Add).unwrap();
        let mut m = SessionMachine::new(&settings, vec![q], fixed_clock())
            .unwrap()
            .with_student_name(Some("Ada".into()));

        m.clock_mut().advance(Duration::milliseconds(3_250));
        m.submit(SubmittedAnswer::new(2, Some(4))).unwrap();
        m.advance().unwrap();

        let entry = &m.history()[0];
        assert_eq!(entry.user_answer, "2/4");
        assert!(entry.is_correct);
        assert!((entry.time_taken - 3.25).abs() < 1e-9);
        assert_eq!(m.result().unwrap().student_name(), Some("Ada"));
    }

    #[test]
    fn progress_tracks_position_in_each_phase() {
        let mut m = machine(&[(2, 2), (3, 3), (4, 4)]);
        assert_eq!((m.progress().position, m.progress().total), (1, 3));
        answer_current(&mut m, false);
        assert_eq!((m.progress().position, m.progress().total), (2, 3));
        answer_current(&mut m, true);
        answer_current(&mut m, true);
        m.proceed_to_retry().unwrap();
        let progress = m.progress();
        assert_eq!(progress.phase, SessionPhase::RetryRound);
        assert_eq!((progress.position, progress.total), (1, 1));
        assert_eq!(progress.answered, 3);
    }
}
