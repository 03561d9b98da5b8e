use chrono::{DateTime, Utc};
use std::sync::Arc;

use math_core::model::{GameMode, GameResult, ScoreBand};
use storage::repository::{GameResultRepository, GameResultRow, ResultId};

use crate::error::SessionError;

/// Presentation-agnostic row for a stored result.
///
/// No pre-formatted strings; the UI decides how to show dates and scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListItem {
    pub id: ResultId,
    pub student_name: Option<String>,
    pub date: DateTime<Utc>,
    pub mode: GameMode,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub band: ScoreBand,
    pub retry_count: u32,
    pub completed: bool,
}

impl ResultListItem {
    #[must_use]
    pub fn from_row(row: &GameResultRow) -> Self {
        let result = &row.result;
        Self {
            id: row.id,
            student_name: result.student_name().map(str::to_owned),
            date: result.date(),
            mode: result.mode(),
            score: result.score(),
            total_questions: result.total_questions(),
            percentage: result.percentage(),
            band: result.band(),
            retry_count: result.retry_count(),
            completed: result.completed(),
        }
    }
}

/// Performance history and teacher dashboard access, hiding repositories from the UI.
#[derive(Clone)]
pub struct ResultHistoryService {
    results: Arc<dyn GameResultRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn GameResultRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// Recent results for the learner's history panel.
    ///
    /// Storage problems are logged and produce an empty list.
    pub async fn load_recent(&self, limit: u32) -> Vec<GameResult> {
        match self.results.list_recent(limit).await {
            Ok(rows) => rows.into_iter().map(|row| row.result).collect(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load recent results");
                Vec::new()
            }
        }
    }

    /// All recent results as dashboard rows.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ResultListItem>, SessionError> {
        let rows = self.results.list_recent(limit).await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }

    /// Dashboard rows for one student.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_for_student(
        &self,
        student_name: &str,
        limit: u32,
    ) -> Result<Vec<ResultListItem>, SessionError> {
        let rows = self
            .results
            .list_for_student(student_name.trim(), limit)
            .await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }

    /// Fetch a result by id, including its history.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn get_result(&self, id: ResultId) -> Result<GameResult, SessionError> {
        Ok(self.results.get_result(id).await?)
    }

    /// Remove every stored result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn clear_all(&self) -> Result<u64, SessionError> {
        let removed = self.results.clear_results().await?;
        tracing::info!(removed, "cleared stored results");
        Ok(removed)
    }
}
