use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use math_core::model::{GameResult, GameSettings, Question};
use math_core::{QuestionGenerator, SubmittedAnswer};

use super::machine::{SessionMachine, SessionPhase, SubmissionOutcome, TickOutcome};
use super::progress::{SessionProgress, SessionSnapshot};
use super::sink::ResultSink;
use super::timer::RoundTimer;
use crate::Clock;
use crate::error::SessionError;
use crate::explain_service::{ExplanationService, Explainer};

/// How long answer feedback stays on screen before the session moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackDelays {
    pub main_round: Duration,
    pub retry_correct: Duration,
    pub retry_wrong: Duration,
}

impl Default for FeedbackDelays {
    fn default() -> Self {
        Self {
            main_round: Duration::from_millis(1_000),
            retry_correct: Duration::from_millis(1_000),
            retry_wrong: Duration::from_millis(800),
        }
    }
}

impl FeedbackDelays {
    /// No pauses at all; used by tests and scripted play.
    #[must_use]
    pub fn none() -> Self {
        Self {
            main_round: Duration::ZERO,
            retry_correct: Duration::ZERO,
            retry_wrong: Duration::ZERO,
        }
    }

    fn for_outcome(&self, outcome: &SubmissionOutcome) -> Duration {
        match (outcome.phase, outcome.is_correct) {
            (SessionPhase::RetryRound, true) => self.retry_correct,
            (SessionPhase::RetryRound, false) => self.retry_wrong,
            _ => self.main_round,
        }
    }
}

/// Starts practice sessions with shared collaborators.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    generator: QuestionGenerator,
    delays: FeedbackDelays,
    sink: Option<ResultSink>,
    explainer: Arc<dyn Explainer>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            generator: QuestionGenerator::new(),
            delays: FeedbackDelays::default(),
            sink: None,
            explainer: Arc::new(ExplanationService::disabled()),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: ResultSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = explainer;
        self
    }

    #[must_use]
    pub fn with_delays(mut self, delays: FeedbackDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Start a new session with fresh random questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid settings or an empty question set.
    pub async fn start_session(
        &self,
        settings: &GameSettings,
        student_name: Option<String>,
    ) -> Result<PracticeSession, SessionError> {
        let mut rng = rand::rng();
        let machine = SessionMachine::start(settings, &self.generator, &mut rng, self.clock)?;
        Ok(self.launch(machine, student_name))
    }

    /// Start a session whose questions are reproducible from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid settings or an empty question set.
    pub async fn start_session_seeded(
        &self,
        settings: &GameSettings,
        student_name: Option<String>,
        seed: u64,
    ) -> Result<PracticeSession, SessionError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let machine = SessionMachine::start(settings, &self.generator, &mut rng, self.clock)?;
        Ok(self.launch(machine, student_name))
    }

    /// Start a session over a fixed question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub async fn start_with_questions(
        &self,
        settings: &GameSettings,
        questions: Vec<Question>,
        student_name: Option<String>,
    ) -> Result<PracticeSession, SessionError> {
        settings.validate()?;
        let machine = SessionMachine::new(settings, questions, self.clock)?;
        Ok(self.launch(machine, student_name))
    }

    fn launch(&self, machine: SessionMachine, student_name: Option<String>) -> PracticeSession {
        let timed = machine.remaining_secs().is_some();
        tracing::info!(
            mode = %machine.mode(),
            questions = machine.questions().len(),
            timed,
            "session started"
        );
        let machine = Arc::new(Mutex::new(machine.with_student_name(student_name)));
        let timer = timed.then(|| spawn_countdown(Arc::clone(&machine), self.sink.clone()));
        PracticeSession {
            machine,
            timer,
            delays: self.delays,
            pending: None,
            sink: self.sink.clone(),
            explainer: Arc::clone(&self.explainer),
        }
    }
}

fn lock(machine: &Mutex<SessionMachine>) -> MutexGuard<'_, SessionMachine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

fn publish(machine: &Mutex<SessionMachine>, sink: Option<&ResultSink>) {
    let Some(result) = lock(machine).take_unsaved_result() else {
        return;
    };
    match sink {
        Some(sink) => sink.notify(result),
        None => tracing::debug!("no result sink configured; result not saved"),
    }
}

fn spawn_countdown(machine: Arc<Mutex<SessionMachine>>, sink: Option<ResultSink>) -> RoundTimer {
    RoundTimer::every_second(move || {
        let outcome = lock(&machine).tick();
        match outcome {
            TickOutcome::Expired => {
                publish(&machine, sink.as_ref());
                ControlFlow::Break(())
            }
            TickOutcome::Counted { .. } => ControlFlow::Continue(()),
            TickOutcome::Ignored => {
                if lock(&machine).phase() == SessionPhase::MainRound {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        }
    })
}

/// A running session: the state machine plus its timer and collaborators.
///
/// The machine sits behind a mutex shared with the timer task; the lock is
/// never held across an await.
pub struct PracticeSession {
    machine: Arc<Mutex<SessionMachine>>,
    timer: Option<RoundTimer>,
    delays: FeedbackDelays,
    pending: Option<SubmissionOutcome>,
    sink: Option<ResultSink>,
    explainer: Arc<dyn Explainer>,
}

impl PracticeSession {
    /// Submit raw answer fields for the question on screen.
    ///
    /// Grades, waits out the feedback delay, then advances. Input that is not
    /// a number is rejected before grading and leaves the session untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unparseable input and the
    /// state machine's errors for out-of-phase submissions.
    pub async fn submit(
        &mut self,
        numerator: &str,
        denominator: Option<&str>,
    ) -> Result<SubmissionOutcome, SessionError> {
        let outcome = self.grade(numerator, denominator)?;
        self.settle().await?;
        Ok(outcome)
    }

    /// Grade an answer and hold its feedback without advancing.
    ///
    /// Lets a front end show feedback before calling `settle`.
    ///
    /// # Errors
    ///
    /// Same as `submit`.
    pub fn grade(
        &mut self,
        numerator: &str,
        denominator: Option<&str>,
    ) -> Result<SubmissionOutcome, SessionError> {
        let answer = SubmittedAnswer::parse(numerator, denominator)?;
        let outcome = lock(&self.machine).submit(answer)?;
        self.pending = Some(outcome);
        Ok(outcome)
    }

    /// Wait out the feedback delay for the last graded answer, then advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingFeedback` if nothing was graded.
    pub async fn settle(&mut self) -> Result<SessionPhase, SessionError> {
        let outcome = self.pending.take().ok_or(SessionError::NoPendingFeedback)?;
        let delay = self.delays.for_outcome(&outcome);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let phase = lock(&self.machine).advance()?;
        self.after_transition(phase);
        Ok(phase)
    }

    /// Open help for the current question and fetch an explanation.
    ///
    /// The countdown is paused until `close_help`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` when no question is on screen.
    pub async fn request_help(&self) -> Result<String, SessionError> {
        let question = lock(&self.machine).request_help()?;
        if let Some(timer) = &self.timer {
            timer.pause();
        }
        Ok(self.explainer.explain(&question).await)
    }

    pub fn close_help(&self) {
        lock(&self.machine).close_help();
        if let Some(timer) = &self.timer {
            timer.resume();
        }
    }

    /// Confirm the retry introduction.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside the retry introduction.
    pub fn proceed_to_retry(&mut self) -> Result<(), SessionError> {
        lock(&self.machine).proceed_to_retry()?;
        self.after_transition(SessionPhase::RetryRound);
        Ok(())
    }

    /// Leave early. The incomplete result is still handed to persistence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already ended.
    pub fn exit(&mut self) -> Result<GameResult, SessionError> {
        let result = lock(&self.machine).exit()?.clone();
        self.pending = None;
        self.after_transition(SessionPhase::Abandoned);
        Ok(result)
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        lock(&self.machine).phase()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase().is_terminal()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        lock(&self.machine).current_question().cloned()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        lock(&self.machine).progress()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.machine).snapshot()
    }

    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        lock(&self.machine).result().cloned()
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|t| !t.is_finished() && !t.is_paused())
    }

    fn after_transition(&mut self, phase: SessionPhase) {
        if phase != SessionPhase::MainRound {
            if let Some(timer) = self.timer.take() {
                timer.cancel();
            }
        }
        if phase.is_terminal() {
            publish(&self.machine, self.sink.as_ref());
        }
    }
}
