use std::{
    fmt::Display,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "VND";

/// Computed and client-supplied amounts may differ by at most one smallest currency unit.
pub const AMOUNT_TOLERANCE: Money = Money(1);

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money, expressed in the smallest unit of the shop currency.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount of money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    /// Fractional amounts are rounded to the nearest unit, with halves rounded away from zero.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(MoneyConversionError(format!("{value} is not a finite number")));
        }
        let rounded = value.round();
        if rounded > i64::MAX as f64 || rounded < i64::MIN as f64 {
            return Err(MoneyConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(rounded as i64))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {DEFAULT_CURRENCY_CODE}", self.0)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs_diff(&self, other: Money) -> Money {
        #[allow(clippy::cast_possible_wrap)]
        Money(self.0.abs_diff(other.0) as i64)
    }

    /// Multiplies the amount by `rate`, rounding the result to the nearest unit (halves away from zero).
    pub fn scale(&self, rate: f64) -> Money {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        Money((self.0 as f64 * rate).round() as i64)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_mul(&self, rhs: i64) -> Option<Money> {
        self.0.checked_mul(rhs).map(Money)
    }

    /// True if the two amounts differ by no more than [`AMOUNT_TOLERANCE`].
    pub fn is_close_to(&self, other: Money) -> bool {
        self.abs_diff(other) <= AMOUNT_TOLERANCE
    }
}
