#![forbid(unsafe_code)]

pub mod aggregate;
pub mod checker;
pub mod generator;
pub mod model;
pub mod numbers;
pub mod time;

pub use aggregate::ResultAggregator;
pub use checker::{AnswerChecker, AnswerParseError, SubmittedAnswer};
pub use generator::QuestionGenerator;
pub use time::Clock;
