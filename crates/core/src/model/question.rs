use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::fraction::{Fraction, FractionError, MixedNumber};
use crate::model::ids::QuestionId;

//
// ─── MODES AND OPERATORS ───────────────────────────────────────────────────────
//

/// Kind of practice round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    TimesTables,
    FractionsOps,
    MixedToImproper,
}

impl GameMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::TimesTables => "TIMES_TABLES",
            GameMode::FractionsOps => "FRACTIONS_OPS",
            GameMode::MixedToImproper => "MIXED_TO_IMPROPER",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TIMES_TABLES" => Some(GameMode::TimesTables),
            "FRACTIONS_OPS" => Some(GameMode::FractionsOps),
            "MIXED_TO_IMPROPER" => Some(GameMode::MixedToImproper),
            _ => None,
        }
    }

    /// Whether answers in this mode carry a denominator.
    #[must_use]
    pub fn expects_fraction(self) -> bool {
        !matches!(self, GameMode::TimesTables)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator for like-fraction questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FractionOp {
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "sub")]
    Subtract,
    #[serde(rename = "mul")]
    Multiply,
    #[serde(rename = "div")]
    Divide,
}

impl FractionOp {
    pub const ALL: [FractionOp; 4] = [
        FractionOp::Add,
        FractionOp::Subtract,
        FractionOp::Multiply,
        FractionOp::Divide,
    ];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            FractionOp::Add => "+",
            FractionOp::Subtract => "-",
            FractionOp::Multiply => "×",
            FractionOp::Divide => "÷",
        }
    }

    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            FractionOp::Add => "add",
            FractionOp::Subtract => "subtract",
            FractionOp::Multiply => "multiply",
            FractionOp::Divide => "divide",
        }
    }

    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(self, FractionOp::Add | FractionOp::Multiply)
    }
}

//
// ─── PAYLOAD AND ANSWER ────────────────────────────────────────────────────────
//

/// Operands of a question, keyed by mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionData {
    TimesTables {
        table: i64,
        multiplier: i64,
    },
    FractionsOps {
        left: Fraction,
        op: FractionOp,
        right: Fraction,
    },
    MixedToImproper {
        mixed: MixedNumber,
    },
}

/// Canonical answer. `den == None` means a whole-number answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub num: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub den: Option<i64>,
}

impl Answer {
    #[must_use]
    pub fn whole(num: i64) -> Self {
        Self { num, den: None }
    }

    #[must_use]
    pub fn fraction(f: Fraction) -> Self {
        Self {
            num: f.num(),
            den: Some(f.den()),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.den {
            Some(den) => write!(f, "{}/{}", self.num, den),
            None => write!(f, "{}", self.num),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A generated practice question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    data: QuestionData,
    answer: Answer,
}

impl Question {
    /// `table × multiplier`, answered by the product.
    #[must_use]
    pub fn times_table(table: i64, multiplier: i64) -> Self {
        Self {
            id: QuestionId::generate(),
            text: format!("{table} × {multiplier}"),
            data: QuestionData::TimesTables { table, multiplier },
            answer: Answer::whole(table * multiplier),
        }
    }

    /// Like-fraction question `n1/den op n2/den`.
    ///
    /// For subtraction the operands are swapped so the larger comes first.
    /// The stored answer is reduced; the displayed operands are not.
    ///
    /// # Errors
    ///
    /// Returns `FractionError::ZeroDenominator` if `den == 0`, or if a division
    /// would have a zero divisor. Returns `FractionError::Overflow` if the raw
    /// answer does not fit in `i64`.
    pub fn fraction_op(n1: i64, n2: i64, den: i64, op: FractionOp) -> Result<Self, FractionError> {
        let (n1, n2) = if op == FractionOp::Subtract && n1 < n2 {
            (n2, n1)
        } else {
            (n1, n2)
        };
        let left = Fraction::new(n1, den)?;
        let right = Fraction::new(n2, den)?;

        let raw = match op {
            FractionOp::Add => Fraction::new(checked(n1.checked_add(n2))?, den)?,
            FractionOp::Subtract => Fraction::new(checked(n1.checked_sub(n2))?, den)?,
            FractionOp::Multiply => Fraction::new(
                checked(n1.checked_mul(n2))?,
                checked(den.checked_mul(den))?,
            )?,
            // (n1/d) ÷ (n2/d): the shared denominator cancels.
            FractionOp::Divide => Fraction::new(n1, n2)?,
        };

        Ok(Self {
            id: QuestionId::generate(),
            text: format!("{left} {} {right}", op.symbol()),
            data: QuestionData::FractionsOps { left, op, right },
            answer: Answer::fraction(raw.reduced()),
        })
    }

    /// Convert `whole num/den` into an improper fraction.
    ///
    /// # Errors
    ///
    /// Returns `FractionError::ZeroDenominator` if `den == 0`, or
    /// `FractionError::Overflow` if the improper numerator does not fit in `i64`.
    pub fn mixed_to_improper(whole: i64, num: i64, den: i64) -> Result<Self, FractionError> {
        let mixed = MixedNumber::new(whole, Fraction::new(num, den)?);
        let improper = mixed.to_improper()?;
        Ok(Self {
            id: QuestionId::generate(),
            text: format!("Convert {mixed} to improper"),
            data: QuestionData::MixedToImproper { mixed },
            answer: Answer::fraction(improper),
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn data(&self) -> &QuestionData {
        &self.data
    }

    #[must_use]
    pub fn answer(&self) -> Answer {
        self.answer
    }

    #[must_use]
    pub fn mode(&self) -> GameMode {
        match self.data {
            QuestionData::TimesTables { .. } => GameMode::TimesTables,
            QuestionData::FractionsOps { .. } => GameMode::FractionsOps,
            QuestionData::MixedToImproper { .. } => GameMode::MixedToImproper,
        }
    }

    /// Duplicate-suppression key built from operands only.
    ///
    /// Operands of commutative operations are ordered, so `3 × 7` and `7 × 3`
    /// share a signature.
    #[must_use]
    pub fn signature(&self) -> String {
        match self.data {
            QuestionData::TimesTables { table, multiplier } => {
                let (lo, hi) = ordered(table, multiplier);
                format!("{lo}x{hi}")
            }
            QuestionData::FractionsOps { left, op, right } => {
                let swap = op.is_commutative()
                    && (right.num(), right.den()) < (left.num(), left.den());
                let (a, b) = if swap {
                    (right, left)
                } else {
                    (left, right)
                };
                format!("{a}{}{b}", op.symbol())
            }
            QuestionData::MixedToImproper { mixed } => {
                format!("{}_{}", mixed.whole, mixed.fraction)
            }
        }
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

fn checked(value: Option<i64>) -> Result<i64, FractionError> {
    value.ok_or(FractionError::Overflow)
}
