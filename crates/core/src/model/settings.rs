use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

use crate::model::question::{FractionOp, GameMode};

/// Tables a learner may pick from.
pub const TABLE_RANGE: RangeInclusive<i64> = 2..=12;

/// Denominators used for fraction operations when none are selected.
pub const DEFAULT_FRACTION_DENOMINATORS: [i64; 8] = [2, 3, 4, 5, 6, 8, 10, 12];

/// Denominators used for mixed numbers when none are selected.
pub const DEFAULT_MIXED_DENOMINATORS: [i64; 6] = [2, 3, 4, 5, 6, 8];

pub const DEFAULT_MAX_WHOLE_NUMBER: i64 = 5;

/// Largest denominator a round may select.
pub const MAX_DENOMINATOR: i64 = 100;

/// Largest whole part a mixed-number round may use.
pub const MAX_WHOLE_NUMBER_LIMIT: i64 = 100;

const DEFAULT_QUESTION_COUNT: usize = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("table {0} is outside 2..=12")]
    InvalidTable(i64),

    #[error("denominator {0} must be >= 2")]
    InvalidDenominator(i64),

    #[error("denominator {0} exceeds {MAX_DENOMINATOR}")]
    DenominatorTooLarge(i64),

    #[error("max whole number must be >= 1, got {0}")]
    InvalidMaxWholeNumber(i64),

    #[error("max whole number {0} exceeds {MAX_WHOLE_NUMBER_LIMIT}")]
    MaxWholeNumberTooLarge(i64),
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Round configuration consumed by the question generator.
///
/// Empty selections fall back to defaults: all tables, `add` only, and the
/// built-in denominator set for the mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub mode: GameMode,
    pub question_count: usize,
    /// Zero means no time limit.
    #[serde(default)]
    pub time_limit_seconds: u32,
    #[serde(default)]
    pub selected_tables: Vec<i64>,
    #[serde(default)]
    pub fraction_ops: Vec<FractionOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_denominators: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_whole_number: Option<i64>,
}

impl GameSettings {
    /// Ten untimed questions with every default selection.
    #[must_use]
    pub fn default_for(mode: GameMode) -> Self {
        Self {
            mode,
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit_seconds: 0,
            selected_tables: Vec::new(),
            fraction_ops: Vec::new(),
            selected_denominators: Vec::new(),
            max_whole_number: None,
        }
    }

    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: impl Into<Vec<i64>>) -> Self {
        self.selected_tables = tables.into();
        self
    }

    #[must_use]
    pub fn with_ops(mut self, ops: impl Into<Vec<FractionOp>>) -> Self {
        self.fraction_ops = ops.into();
        self
    }

    #[must_use]
    pub fn with_denominators(mut self, dens: impl Into<Vec<i64>>) -> Self {
        self.selected_denominators = dens.into();
        self
    }

    #[must_use]
    pub fn with_max_whole_number(mut self, max: i64) -> Self {
        self.max_whole_number = Some(max);
        self
    }

    /// Checks ranges that would otherwise make generation meaningless.
    ///
    /// # Errors
    ///
    /// Returns the first `SettingsError` found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.question_count == 0 {
            return Err(SettingsError::InvalidQuestionCount);
        }
        if let Some(&bad) = self.selected_tables.iter().find(|t| !TABLE_RANGE.contains(t)) {
            return Err(SettingsError::InvalidTable(bad));
        }
        for &den in &self.selected_denominators {
            if den < 2 {
                return Err(SettingsError::InvalidDenominator(den));
            }
            if den > MAX_DENOMINATOR {
                return Err(SettingsError::DenominatorTooLarge(den));
            }
        }
        match self.max_whole_number {
            Some(max) if max < 1 => Err(SettingsError::InvalidMaxWholeNumber(max)),
            Some(max) if max > MAX_WHOLE_NUMBER_LIMIT => {
                Err(SettingsError::MaxWholeNumberTooLarge(max))
            }
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_seconds > 0
    }

    /// Tables to draw from.
    #[must_use]
    pub fn tables(&self) -> Vec<i64> {
        if self.selected_tables.is_empty() {
            TABLE_RANGE.collect()
        } else {
            self.selected_tables.clone()
        }
    }

    /// Operators to draw from.
    #[must_use]
    pub fn ops(&self) -> Vec<FractionOp> {
        if self.fraction_ops.is_empty() {
            vec![FractionOp::Add]
        } else {
            self.fraction_ops.clone()
        }
    }

    /// Denominators to draw from for the configured mode.
    #[must_use]
    pub fn denominators(&self) -> Vec<i64> {
        if !self.selected_denominators.is_empty() {
            return self.selected_denominators.clone();
        }
        match self.mode {
            GameMode::MixedToImproper => DEFAULT_MIXED_DENOMINATORS.to_vec(),
            GameMode::TimesTables | GameMode::FractionsOps => {
                DEFAULT_FRACTION_DENOMINATORS.to_vec()
            }
        }
    }

    #[must_use]
    pub fn max_whole(&self) -> i64 {
        self.max_whole_number.unwrap_or(DEFAULT_MAX_WHOLE_NUMBER)
    }
}
