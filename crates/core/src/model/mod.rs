mod fraction;
mod ids;
mod question;
mod result;
mod settings;

pub use fraction::{Fraction, FractionError, MixedNumber};
pub use ids::{ParseIdError, QuestionId};
pub use question::{Answer, FractionOp, GameMode, Question, QuestionData};
pub use result::{GameResult, GameResultError, HistoryEntry, ScoreBand};
pub use settings::{
    DEFAULT_FRACTION_DENOMINATORS, DEFAULT_MAX_WHOLE_NUMBER, DEFAULT_MIXED_DENOMINATORS,
    GameSettings, MAX_DENOMINATOR, MAX_WHOLE_NUMBER_LIMIT, SettingsError, TABLE_RANGE,
};
