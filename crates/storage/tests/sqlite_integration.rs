use chrono::Duration;
use math_core::model::{FractionOp, GameMode, HistoryEntry, Question};
use math_core::time::fixed_now;
use math_core::{AnswerChecker, ResultAggregator};
use storage::repository::{GameResultRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn fraction_history() -> Vec<HistoryEntry> {
    let q1 = Question::fraction_op(1, 2, 5, FractionOp::Add).unwrap();
    let q2 = Question::fraction_op(3, 1, 4, FractionOp::Subtract).unwrap();
    vec![
        HistoryEntry {
            is_correct: AnswerChecker::check(&q1, 3, Some(5)),
            question: q1,
            user_answer: "3/5".into(),
            time_taken: 2.0,
        },
        HistoryEntry {
            is_correct: AnswerChecker::check(&q2, 1, Some(4)),
            question: q2,
            user_answer: "1/4".into(),
            time_taken: 4.5,
        },
    ]
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_history_payloads() {
    let repo = connect("memdb_results_roundtrip").await;

    let result = ResultAggregator::aggregate(
        fraction_history(),
        3,
        GameMode::FractionsOps,
        2,
        true,
        fixed_now(),
    )
    .with_student_name("Ada");

    let id = repo.append_result(&result).await.expect("append");
    let fetched = repo.get_result(id).await.expect("fetch");

    assert_eq!(fetched, result);
    assert_eq!(fetched.score(), 1);
    assert_eq!(fetched.unanswered(), 1);
    assert_eq!(fetched.history()[1].question.text(), "3/4 - 1/4");
}

#[tokio::test]
async fn sqlite_lists_recent_and_by_student() {
    let repo = connect("memdb_results_listing").await;

    for (minutes, name) in [(0, "Ada"), (5, "Bo"), (10, "Ada")] {
        let result = ResultAggregator::aggregate(
            Vec::new(),
            4,
            GameMode::TimesTables,
            0,
            false,
            fixed_now() + Duration::minutes(minutes),
        )
        .with_student_name(name);
        repo.append_result(&result).await.unwrap();
    }

    let recent = repo.list_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].result.student_name(), Some("Ada"));
    assert_eq!(recent[1].result.student_name(), Some("Bo"));

    let ada = repo.list_for_student("Ada", 10).await.unwrap();
    assert_eq!(ada.len(), 2);
    assert!(ada.iter().all(|row| !row.result.completed()));
}

#[tokio::test]
async fn sqlite_skips_corrupt_rows_when_listing() {
    let repo = connect("memdb_results_corrupt").await;

    let good = ResultAggregator::aggregate(
        Vec::new(),
        2,
        GameMode::MixedToImproper,
        0,
        true,
        fixed_now(),
    );
    repo.append_result(&good).await.unwrap();

    sqlx::query(
        r"
            INSERT INTO game_results (
                student_name, mode, score, total_questions,
                retry_count, completed, played_at, history_json
            )
            VALUES ('Eve', 'NOT_A_MODE', 0, 1, 0, 1, '2023-11-14T22:13:20Z', '[]')
        ",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let rows = repo.list_recent(10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result.mode(), GameMode::MixedToImproper);
}

#[tokio::test]
async fn sqlite_clear_and_missing_ids() {
    let repo = connect("memdb_results_clear").await;
    let result =
        ResultAggregator::aggregate(Vec::new(), 1, GameMode::TimesTables, 0, true, fixed_now());
    let id = repo.append_result(&result).await.unwrap();

    assert_eq!(repo.clear_results().await.unwrap(), 1);
    assert!(matches!(
        repo.get_result(id).await,
        Err(StorageError::NotFound)
    ));
}
