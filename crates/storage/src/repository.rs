use async_trait::async_trait;
use math_core::model::GameResult;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier of a persisted result.
pub type ResultId = i64;

/// A persisted result together with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct GameResultRow {
    pub id: ResultId,
    pub result: GameResult,
}

impl GameResultRow {
    #[must_use]
    pub fn new(id: ResultId, result: GameResult) -> Self {
        Self { id, result }
    }
}

/// Persistence contract for finished and abandoned rounds.
///
/// Listings are newest first (by result date, then by id).
#[async_trait]
pub trait GameResultRepository: Send + Sync {
    /// Append a result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &GameResult) -> Result<ResultId, StorageError>;

    /// Fetch a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<GameResult, StorageError>;

    /// Most recent results, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_recent(&self, limit: u32) -> Result<Vec<GameResultRow>, StorageError>;

    /// Most recent results for one student (exact name match).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_for_student(
        &self,
        student_name: &str,
        limit: u32,
    ) -> Result<Vec<GameResultRow>, StorageError>;

    /// Delete every stored result, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_results(&self) -> Result<u64, StorageError>;
}

/// Simple in-memory repository for tests and local play without a database.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<GameResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first<'a>(
        rows: impl Iterator<Item = &'a GameResultRow>,
        limit: u32,
    ) -> Vec<GameResultRow> {
        let mut out: Vec<GameResultRow> = rows.cloned().collect();
        out.sort_by(|a, b| {
            b.result
                .date()
                .cmp(&a.result.date())
                .then_with(|| b.id.cmp(&a.id))
        });
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        out
    }
}

#[async_trait]
impl GameResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &GameResult) -> Result<ResultId, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(GameResultRow::new(id, result.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<GameResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<GameResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::newest_first(guard.iter(), limit))
    }

    async fn list_for_student(
        &self,
        student_name: &str,
        limit: u32,
    ) -> Result<Vec<GameResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::newest_first(
            guard
                .iter()
                .filter(|row| row.result.student_name() == Some(student_name)),
            limit,
        ))
    }

    async fn clear_results(&self) -> Result<u64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = guard.len() as u64;
        guard.clear();
        Ok(removed)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn GameResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let results: Arc<dyn GameResultRepository> = Arc::new(InMemoryRepository::new());
        Self { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use math_core::ResultAggregator;
    use math_core::model::{GameMode, HistoryEntry, Question};
    use math_core::time::fixed_now;

    fn result(student: &str, minutes: i64, score_correct: usize) -> GameResult {
        let history = (0..3)
            .map(|i| HistoryEntry {
                question: Question::times_table(3, 4),
                user_answer: "12".into(),
                is_correct: i < score_correct,
                time_taken: 1.5,
            })
            .collect();
        ResultAggregator::aggregate(
            history,
            3,
            GameMode::TimesTables,
            0,
            true,
            fixed_now() + Duration::minutes(minutes),
        )
        .with_student_name(student)
    }

    #[tokio::test]
    async fn appends_and_fetches_by_id() {
        let repo = InMemoryRepository::new();
        let id = repo.append_result(&result("Ada", 0, 2)).await.unwrap();
        let fetched = repo.get_result(id).await.unwrap();
        assert_eq!(fetched.score(), 2);
        assert!(matches!(
            repo.get_result(id + 10).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let repo = InMemoryRepository::new();
        repo.append_result(&result("Ada", 0, 1)).await.unwrap();
        repo.append_result(&result("Bo", 10, 2)).await.unwrap();
        repo.append_result(&result("Ada", 5, 3)).await.unwrap();

        let recent = repo.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].result.student_name(), Some("Bo"));
        assert_eq!(recent[1].result.score(), 3);

        let ada = repo.list_for_student("Ada", 10).await.unwrap();
        assert_eq!(ada.len(), 2);
        assert!(ada[0].result.date() > ada[1].result.date());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let repo = InMemoryRepository::new();
        repo.append_result(&result("Ada", 0, 1)).await.unwrap();
        repo.append_result(&result("Ada", 1, 1)).await.unwrap();
        assert_eq!(repo.clear_results().await.unwrap(), 2);
        assert!(repo.list_recent(10).await.unwrap().is_empty());
    }
}
