use math_core::model::{GameMode, GameResult, HistoryEntry};
use sqlx::Row;

use crate::repository::{GameResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_mode(s: &str) -> Result<GameMode, StorageError> {
    GameMode::parse(s).ok_or_else(|| StorageError::Serialization(format!("invalid mode: {s}")))
}

pub(crate) fn history_to_json(history: &[HistoryEntry]) -> Result<String, StorageError> {
    serde_json::to_string(history).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<GameResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let student_name: Option<String> = row.try_get("student_name").map_err(ser)?;
    let mode = parse_mode(&row.try_get::<String, _>("mode").map_err(ser)?)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let retry_count = u32_from_i64(
        "retry_count",
        row.try_get::<i64, _>("retry_count").map_err(ser)?,
    )?;
    let completed = row.try_get::<i64, _>("completed").map_err(ser)? != 0;
    let played_at = row.try_get("played_at").map_err(ser)?;
    let history_json: String = row.try_get("history_json").map_err(ser)?;
    let history: Vec<HistoryEntry> = serde_json::from_str(&history_json).map_err(ser)?;

    let result = GameResult::from_persisted(
        student_name,
        score,
        total,
        played_at,
        mode,
        retry_count,
        completed,
        history,
    )
    .map_err(ser)?;

    Ok(GameResultRow::new(id, result))
}

/// Maps rows, skipping any that no longer decode.
pub(crate) fn map_rows_lossy(rows: &[sqlx::sqlite::SqliteRow]) -> Vec<GameResultRow> {
    rows.iter()
        .filter_map(|row| match map_result_row(row) {
            Ok(mapped) => Some(mapped),
            Err(err) => {
                tracing::warn!(error = %err, "skipping corrupt game result row");
                None
            }
        })
        .collect()
}
