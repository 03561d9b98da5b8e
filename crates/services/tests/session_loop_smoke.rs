use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use math_core::model::{GameMode, GameSettings, Question};
use math_core::time::fixed_now;
use services::{
    Clock, Explainer, FeedbackDelays, ResultSink, SessionError, SessionLoopService, SessionPhase,
};
use storage::repository::{GameResultRepository, InMemoryRepository};

struct CannedExplainer;

#[async_trait]
impl Explainer for CannedExplainer {
    async fn explain(&self, question: &Question) -> String {
        format!("think about {}", question.text())
    }
}

fn times_questions(pairs: &[(i64, i64)]) -> Vec<Question> {
    pairs
        .iter()
        .map(|&(a, b)| Question::times_table(a, b))
        .collect()
}

fn loop_with_sink(repo: &Arc<InMemoryRepository>) -> (SessionLoopService, tokio::task::JoinHandle<usize>) {
    let (sink, worker) = ResultSink::spawn(repo.clone());
    let svc = SessionLoopService::new(Clock::fixed(fixed_now()))
        .with_sink(sink)
        .with_delays(FeedbackDelays::none())
        .with_explainer(Arc::new(CannedExplainer));
    (svc, worker)
}

fn right_answer(q: &Question) -> String {
    q.answer().num.to_string()
}

fn wrong_answer(q: &Question) -> String {
    (q.answer().num + 1).to_string()
}

#[tokio::test]
async fn session_loop_persists_finished_result() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables)
        .with_question_count(5)
        .with_tables(vec![3, 4]);

    let mut session = svc
        .start_session_seeded(&settings, Some("Ada".into()), 7)
        .await
        .unwrap();
    while let Some(q) = session.current_question() {
        let outcome = session.submit(&right_answer(&q), None).await.unwrap();
        assert!(outcome.is_correct);
    }
    assert_eq!(session.phase(), SessionPhase::Finished);
    drop(session);
    drop(svc);

    assert_eq!(worker.await.unwrap(), 1);
    let stored = repo.list_recent(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    let result = &stored[0].result;
    assert_eq!(result.score(), 5);
    assert_eq!(result.total_questions(), 5);
    assert_eq!(result.retry_count(), 0);
    assert!(result.completed());
    assert_eq!(result.student_name(), Some("Ada"));
}

#[tokio::test]
async fn retry_round_then_finish() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, _worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables).with_question_count(4);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(2, 3), (2, 4), (2, 5), (2, 6)]), None)
        .await
        .unwrap();

    for i in 0..4 {
        let q = session.current_question().unwrap();
        let answer = if i < 2 { wrong_answer(&q) } else { right_answer(&q) };
        session.submit(&answer, None).await.unwrap();
    }
    assert_eq!(session.phase(), SessionPhase::RetryIntro);
    assert!(matches!(
        session.submit("6", None).await,
        Err(SessionError::WrongPhase(SessionPhase::RetryIntro))
    ));

    session.proceed_to_retry().unwrap();
    let first = session.current_question().unwrap();
    assert_eq!(first.text(), "2 × 3");
    session.submit(&wrong_answer(&first), None).await.unwrap();
    assert_eq!(session.current_question().unwrap().id(), first.id());
    session.submit(&right_answer(&first), None).await.unwrap();

    let second = session.current_question().unwrap();
    assert_eq!(second.text(), "2 × 4");
    session.submit(&right_answer(&second), None).await.unwrap();

    let result = session.result().unwrap();
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(result.score(), 2);
    assert_eq!(result.total_questions(), 4);
    assert_eq!(result.retry_count(), 1);
    assert!(result.completed());
}

#[tokio::test]
async fn non_numeric_input_is_rejected_before_grading() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, _worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables).with_question_count(1);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(5, 5)]), None)
        .await
        .unwrap();

    assert!(matches!(
        session.submit("  ", None).await,
        Err(SessionError::InvalidInput(_))
    ));
    assert!(matches!(
        session.submit("twenty", None).await,
        Err(SessionError::InvalidInput(_))
    ));
    assert_eq!(session.progress().answered, 0);
    assert_eq!(session.phase(), SessionPhase::MainRound);
}

#[tokio::test]
async fn exit_mid_retry_saves_incomplete_result() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables).with_question_count(2);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(7, 8), (6, 9)]), None)
        .await
        .unwrap();

    let q = session.current_question().unwrap();
    session.submit(&wrong_answer(&q), None).await.unwrap();
    let q = session.current_question().unwrap();
    session.submit(&right_answer(&q), None).await.unwrap();
    session.proceed_to_retry().unwrap();
    let q = session.current_question().unwrap();
    session.submit(&wrong_answer(&q), None).await.unwrap();

    let result = session.exit().unwrap();
    assert!(!result.completed());
    assert_eq!(result.retry_count(), 1);
    assert_eq!(result.score(), 1);
    assert!(matches!(session.exit(), Err(SessionError::Completed)));

    drop(session);
    drop(svc);
    assert_eq!(worker.await.unwrap(), 1);
    assert!(!repo.list_recent(1).await.unwrap()[0].result.completed());
}

#[tokio::test]
async fn help_returns_explanation_text() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, _worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables).with_question_count(1);
    let session = svc
        .start_with_questions(&settings, times_questions(&[(9, 3)]), None)
        .await
        .unwrap();

    let text = session.request_help().await.unwrap();
    assert_eq!(text, "think about 9 × 3");
    assert!(session.progress().help_open);
    session.close_help();
    assert!(!session.progress().help_open);
}

#[tokio::test(start_paused = true)]
async fn timeout_ends_round_and_saves_partial_history() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables)
        .with_question_count(5)
        .with_time_limit(3);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(4, 4); 5]), None)
        .await
        .unwrap();
    assert!(session.timer_running());

    let q = session.current_question().unwrap();
    session.submit(&right_answer(&q), None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert!(matches!(
        session.submit("16", None).await,
        Err(SessionError::Completed)
    ));

    let result = session.result().unwrap();
    assert_eq!(result.total_questions(), 5);
    assert_eq!(result.history().len(), 1);
    assert_eq!(result.unanswered(), 4);

    drop(session);
    drop(svc);
    assert_eq!(worker.await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn help_and_feedback_do_not_consume_time() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, _worker) = loop_with_sink(&repo);
    let svc = svc.with_delays(FeedbackDelays {
        main_round: Duration::from_millis(1_200),
        retry_correct: Duration::ZERO,
        retry_wrong: Duration::ZERO,
    });
    let settings = GameSettings::default_for(GameMode::TimesTables)
        .with_question_count(4)
        .with_time_limit(10);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(3, 3), (3, 4), (3, 5), (3, 6)]), None)
        .await
        .unwrap();

    for _ in 0..2 {
        let q = session.current_question().unwrap();
        session.submit(&right_answer(&q), None).await.unwrap();
    }
    assert_eq!(session.progress().remaining_secs, Some(10));

    session.request_help().await.unwrap();
    assert!(!session.timer_running());
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(session.progress().remaining_secs, Some(10));
    assert_eq!(session.phase(), SessionPhase::MainRound);

    session.close_help();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(session.progress().remaining_secs, Some(9));
}

#[tokio::test]
async fn empty_generation_is_an_error() {
    let svc = SessionLoopService::new(Clock::fixed(fixed_now()));
    let settings = GameSettings::default_for(GameMode::TimesTables);
    assert!(matches!(
        svc.start_with_questions(&settings, Vec::new(), None).await,
        Err(SessionError::Empty)
    ));
    assert!(matches!(
        svc.start_session(&settings.with_question_count(0), None).await,
        Err(SessionError::Settings(_))
    ));
}

#[tokio::test]
async fn grade_holds_feedback_until_settled() {
    let repo = Arc::new(InMemoryRepository::new());
    let (svc, _worker) = loop_with_sink(&repo);
    let settings = GameSettings::default_for(GameMode::TimesTables).with_question_count(2);
    let mut session = svc
        .start_with_questions(&settings, times_questions(&[(2, 9), (3, 9)]), None)
        .await
        .unwrap();

    let outcome = session.grade("18", None).unwrap();
    assert!(outcome.is_correct);
    assert_eq!(session.progress().feedback, Some(services::sessions::Feedback::Correct));
    assert!(matches!(
        session.grade("27", None),
        Err(SessionError::AwaitingFeedback)
    ));

    assert_eq!(session.settle().await.unwrap(), SessionPhase::MainRound);
    assert_eq!(session.current_question().unwrap().text(), "3 × 9");
    assert!(matches!(
        session.settle().await,
        Err(SessionError::NoPendingFeedback)
    ));
}
