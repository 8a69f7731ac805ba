//! Fixed-precision decimal arithmetic for token and share quantities.
//!
//! `Dec` is a non-negative rational with 8 fractional digits stored as a raw
//! `u128` count of 10^-8 units. Token amounts held by the bank use the same
//! raw unit, so a `Dec` of `1.00000000` is one whole token.
//!
//! Products and quotients are computed in 256-bit intermediate precision and
//! rounded deterministically:
//!
//! - `checked_mul` / `checked_quo`: round half to even
//! - `mul_truncate` / `quo_truncate` / `mul_div_floor`: round toward zero

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits.
pub const DEC_PRECISION: usize = 8;

/// Raw value of `1.0`.
const ONE_RAW: u128 = 100_000_000;

/// Non-negative fixed-precision decimal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Dec(u128);

/// Decimal parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecError {
    #[error("Invalid decimal string: {0:?}")]
    Malformed(String),

    #[error("Too many fractional digits: {digits} > 8")]
    TooPrecise { digits: usize },

    #[error("Decimal out of range: {0:?}")]
    OutOfRange(String),
}

impl Dec {
    pub const fn zero() -> Self {
        Dec(0)
    }

    pub const fn one() -> Self {
        Dec(ONE_RAW)
    }

    /// Whole number of units.
    pub const fn from_int(units: u64) -> Self {
        Dec(units as u128 * ONE_RAW)
    }

    /// Build from raw 10^-8 units.
    pub const fn from_raw(raw: u128) -> Self {
        Dec(raw)
    }

    /// `numerator / 10^digits`, e.g. `from_ratio_digits(5, 2) == 0.05`.
    pub fn from_ratio_digits(numerator: u64, digits: usize) -> Option<Self> {
        if digits > DEC_PRECISION {
            return None;
        }
        let scale = 10u128.pow((DEC_PRECISION - digits) as u32);
        (numerator as u128).checked_mul(scale).map(Dec)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Dec) -> Option<Dec> {
        self.0.checked_add(other.0).map(Dec)
    }

    pub fn checked_sub(self, other: Dec) -> Option<Dec> {
        self.0.checked_sub(other.0).map(Dec)
    }

    pub fn saturating_sub(self, other: Dec) -> Dec {
        Dec(self.0.saturating_sub(other.0))
    }

    /// `self * other`, rounded half to even.
    pub fn checked_mul(self, other: Dec) -> Option<Dec> {
        let product = U256::from(self.0) * U256::from(other.0);
        to_dec(div_round_half_even(product, U256::from(ONE_RAW)))
    }

    /// `self * other`, rounded toward zero.
    pub fn mul_truncate(self, other: Dec) -> Option<Dec> {
        let product = U256::from(self.0) * U256::from(other.0);
        to_dec(product / U256::from(ONE_RAW))
    }

    /// `self / other`, rounded half to even. `None` on division by zero.
    pub fn checked_quo(self, other: Dec) -> Option<Dec> {
        if other.is_zero() {
            return None;
        }
        let scaled = U256::from(self.0) * U256::from(ONE_RAW);
        to_dec(div_round_half_even(scaled, U256::from(other.0)))
    }

    /// `self / other`, rounded toward zero. `None` on division by zero.
    pub fn quo_truncate(self, other: Dec) -> Option<Dec> {
        if other.is_zero() {
            return None;
        }
        let scaled = U256::from(self.0) * U256::from(ONE_RAW);
        to_dec(scaled / U256::from(other.0))
    }

    /// `self * numerator / denominator` with a single floor at the end.
    ///
    /// Used for token/share conversion so that no precision is lost to an
    /// intermediate exchange-rate rounding.
    pub fn mul_div_floor(self, numerator: Dec, denominator: Dec) -> Option<Dec> {
        if denominator.is_zero() {
            return None;
        }
        let product = U256::from(self.0) * U256::from(numerator.0);
        to_dec(product / U256::from(denominator.0))
    }

    /// Whole units, fractional part dropped.
    pub const fn truncate_int(self) -> u128 {
        self.0 / ONE_RAW
    }

    /// Drop the fractional part.
    pub const fn truncate(self) -> Dec {
        Dec(self.0 - self.0 % ONE_RAW)
    }
}

fn div_round_half_even(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder << 1;
    if twice > denominator || (twice == denominator && quotient.low_u64() & 1 == 1) {
        quotient + U256::one()
    } else {
        quotient
    }
}

fn to_dec(value: U256) -> Option<Dec> {
    if value > U256::from(u128::MAX) {
        None
    } else {
        Some(Dec(value.as_u128()))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / ONE_RAW,
            self.0 % ONE_RAW,
            width = DEC_PRECISION
        )
    }
}

impl FromStr for Dec {
    type Err = DecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(DecError::Malformed(s.to_string()));
        }
        if s.ends_with('.') {
            return Err(DecError::Malformed(s.to_string()));
        }
        if frac_part.len() > DEC_PRECISION {
            return Err(DecError::TooPrecise {
                digits: frac_part.len(),
            });
        }

        let int_value: u128 = int_part
            .parse()
            .map_err(|_| DecError::OutOfRange(s.to_string()))?;
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = DEC_PRECISION);
            padded
                .parse()
                .map_err(|_| DecError::Malformed(s.to_string()))?
        };

        int_value
            .checked_mul(ONE_RAW)
            .and_then(|raw| raw.checked_add(frac_value))
            .map(Dec)
            .ok_or_else(|| DecError::OutOfRange(s.to_string()))
    }
}
