//! Shared error types for the services crate.

use thiserror::Error;

use math_core::AnswerParseError;
use math_core::model::SettingsError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Errors emitted by `ExplanationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExplainError {
    #[error("explanations are not configured")]
    Disabled,
    #[error("explanation service returned an empty response")]
    EmptyResponse,
    #[error("explanation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while building assignment links.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions could be generated for these settings")]
    Empty,
    #[error("session already finished")]
    Completed,
    #[error("action not allowed while the session is in {0:?}")]
    WrongPhase(SessionPhase),
    #[error("feedback for the previous answer is still showing")]
    AwaitingFeedback,
    #[error("no answer is waiting to be acknowledged")]
    NoPendingFeedback,
    #[error(transparent)]
    InvalidInput(#[from] AnswerParseError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
