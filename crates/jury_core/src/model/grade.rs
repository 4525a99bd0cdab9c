//! Grade domain model and the validated grade value type.
//!
//! # Invariants
//! - A `GradeValue` always lies in `[1.00, 10.00]` with at most two
//!   fractional digits.
//! - At most one `Grade` exists per (deliverable, evaluator) pair; later
//!   submissions update it in place.

use super::deliverable::DeliverableId;
use super::user::UserId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for grade rows.
pub type GradeId = Uuid;

const GRADE_SCALE: u32 = 2;

/// Rejection reasons for raw grade input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeValueError {
    /// Input is not a decimal number.
    Unparseable(String),
    /// More than two significant fractional digits.
    TooPrecise(Decimal),
    /// Outside `[1.00, 10.00]`.
    OutOfRange(Decimal),
}

impl Display for GradeValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable(raw) => write!(f, "grade `{raw}` is not a decimal number"),
            Self::TooPrecise(value) => {
                write!(f, "grade {value} has more than 2 decimal places")
            }
            Self::OutOfRange(value) => write!(f, "grade {value} is outside 1.00..=10.00"),
        }
    }
}

impl Error for GradeValueError {}

/// Score between 1.00 and 10.00 with two-decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct GradeValue(Decimal);

impl GradeValue {
    pub fn min() -> Self {
        Self(Decimal::new(100, GRADE_SCALE))
    }

    pub fn max() -> Self {
        Self(Decimal::new(1000, GRADE_SCALE))
    }

    /// Validates a decimal grade.
    ///
    /// Trailing zeros are not significant (`9.990` is `9.99`); any other
    /// third fractional digit is rejected rather than rounded away.
    pub fn new(value: Decimal) -> Result<Self, GradeValueError> {
        let normalized = value.normalize();
        if normalized.scale() > GRADE_SCALE {
            return Err(GradeValueError::TooPrecise(value));
        }
        let mut rounded =
            normalized.round_dp_with_strategy(GRADE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded < Self::min().0 || rounded > Self::max().0 {
            return Err(GradeValueError::OutOfRange(value));
        }
        rounded.rescale(GRADE_SCALE);
        Ok(Self(rounded))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for GradeValue {
    type Err = GradeValueError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| GradeValueError::Unparseable(trimmed.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for GradeValue {
    type Error = GradeValueError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GradeValue> for Decimal {
    fn from(value: GradeValue) -> Self {
        value.0
    }
}

impl Display for GradeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One juror's score for one deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub id: GradeId,
    pub deliverable_id: DeliverableId,
    pub evaluator_id: UserId,
    pub value: GradeValue,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Grade {
    pub fn new(
        deliverable_id: DeliverableId,
        evaluator_id: UserId,
        value: GradeValue,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            deliverable_id,
            evaluator_id,
            value,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the value; `created_at` is preserved.
    pub fn revise(&mut self, value: GradeValue, now: i64) {
        self.value = value;
        self.updated_at = now;
    }
}
