#![forbid(unsafe_code)]

pub mod app_services;
pub mod assignment;
pub mod error;
pub mod explain_service;
pub mod sessions;

pub use math_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use assignment::{
    Assignment, assignment_from_url, assignment_link, decode_assignment, encode_assignment,
};
pub use error::{AppServicesError, AssignmentError, ExplainError, SessionError};
pub use explain_service::{ExplainConfig, ExplanationService, Explainer};

pub use sessions::{
    FeedbackDelays, PracticeSession, ResultHistoryService, ResultListItem, ResultSink,
    RoundTimer, SessionLoopService, SessionMachine, SessionPhase, SessionProgress,
    SessionSnapshot, SubmissionOutcome,
};
