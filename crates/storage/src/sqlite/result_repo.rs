use math_core::model::GameResult;

use super::SqliteRepository;
use super::mapping::{history_to_json, map_result_row, map_rows_lossy};
use crate::repository::{GameResultRepository, GameResultRow, ResultId, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT
        id, student_name, mode, score, total_questions,
        retry_count, completed, played_at, history_json
    FROM game_results
";

#[async_trait::async_trait]
impl GameResultRepository for SqliteRepository {
    async fn append_result(&self, result: &GameResult) -> Result<ResultId, StorageError> {
        let history_json = history_to_json(result.history())?;

        let res = sqlx::query(
            r"
                INSERT INTO game_results (
                    student_name, mode, score, total_questions,
                    retry_count, completed, played_at, history_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(result.student_name())
        .bind(result.mode().as_str())
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total_questions()))
        .bind(i64::from(result.retry_count()))
        .bind(i64::from(result.completed()))
        .bind(result.date())
        .bind(history_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: ResultId) -> Result<GameResult, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        Ok(map_result_row(&row)?.result)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<GameResultRow>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY played_at DESC, id DESC LIMIT ?1");
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(map_rows_lossy(&rows))
    }

    async fn list_for_student(
        &self,
        student_name: &str,
        limit: u32,
    ) -> Result<Vec<GameResultRow>, StorageError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE student_name = ?1 ORDER BY played_at DESC, id DESC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(student_name)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(map_rows_lossy(&rows))
    }

    async fn clear_results(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM game_results")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.rows_affected())
    }
}
