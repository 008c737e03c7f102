//! Abstract numeric type used by bars, indicators and the trade ledger.
//!
//! Every computation in the pipeline is generic over [`Num`], so the same
//! indicator graph can run on IEEE doubles (`f64`) or on arbitrary precision
//! decimals ([`DecimalNum`]). The concrete type is picked by whoever wires the
//! pipeline; nothing in the crate looks it up globally.
//!
//! A NaN value means "not yet computable". It propagates through arithmetic
//! and is distinct from a legitimate zero.

use num_traits::{One, Zero};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Numeric representation backing prices, volumes and indicator values.
pub trait Num:
    Copy
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Short name of the representation, used in logs and reports.
    const NAME: &'static str;

    /// The "not yet computable" sentinel.
    fn nan() -> Self;

    fn is_nan(&self) -> bool;

    fn from_f64(value: f64) -> Self;

    fn from_i64(value: i64) -> Self;

    /// Lossy conversion for reporting. NaN maps to `f64::NAN`.
    fn to_f64(&self) -> f64;

    fn abs(self) -> Self;

    /// Square root; negative inputs yield NaN.
    fn sqrt(self) -> Self;

    /// Larger of two values, NaN if either is NaN.
    fn max(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            Self::nan()
        } else if other > self {
            other
        } else {
            self
        }
    }

    /// Smaller of two values, NaN if either is NaN.
    fn min(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            Self::nan()
        } else if other < self {
            other
        } else {
            self
        }
    }

    /// Division that resolves a zero divisor to NaN instead of infinity or a panic.
    fn safe_div(self, divisor: Self) -> Self {
        if divisor.is_zero() || divisor.is_nan() || self.is_nan() {
            Self::nan()
        } else {
            self / divisor
        }
    }

    fn from_usize(value: usize) -> Self {
        Self::from_i64(value as i64)
    }
}

impl Num for f64 {
    const NAME: &'static str = "f64";

    #[inline]
    fn nan() -> Self {
        f64::NAN
    }

    #[inline]
    fn is_nan(&self) -> bool {
        f64::is_nan(*self)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn from_i64(value: i64) -> Self {
        value as f64
    }

    #[inline]
    fn to_f64(&self) -> f64 {
        *self
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
}

/// Arbitrary precision number backed by [`rust_decimal::Decimal`].
///
/// `None` plays the role of NaN. Overflow and division by zero also produce
/// NaN rather than panicking.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecimalNum(Option<Decimal>);

impl DecimalNum {
    pub const NAN: DecimalNum = DecimalNum(None);

    pub fn new(value: Decimal) -> Self {
        Self(Some(value))
    }

    /// The wrapped decimal, `None` when NaN.
    pub fn decimal(&self) -> Option<Decimal> {
        self.0
    }

    fn zip(self, rhs: Self, op: impl FnOnce(Decimal, Decimal) -> Option<Decimal>) -> Self {
        match (self.0, rhs.0) {
            (Some(a), Some(b)) => Self(op(a, b)),
            _ => Self::NAN,
        }
    }
}

impl From<Decimal> for DecimalNum {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl PartialEq for DecimalNum {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for DecimalNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl Debug for DecimalNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "DecimalNum({})", d),
            None => write!(f, "DecimalNum(NaN)"),
        }
    }
}

impl Display for DecimalNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => Display::fmt(&d, f),
            None => f.write_str("NaN"),
        }
    }
}

impl Add for DecimalNum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_add(b))
    }
}

impl Sub for DecimalNum {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_sub(b))
    }
}

impl Mul for DecimalNum {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_mul(b))
    }
}

impl Div for DecimalNum {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_div(b))
    }
}

impl Neg for DecimalNum {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.map(|d| -d))
    }
}

impl Zero for DecimalNum {
    fn zero() -> Self {
        Self(Some(Decimal::ZERO))
    }

    fn is_zero(&self) -> bool {
        matches!(self.0, Some(d) if d.is_zero())
    }
}

impl One for DecimalNum {
    fn one() -> Self {
        Self(Some(Decimal::ONE))
    }
}

impl Num for DecimalNum {
    const NAME: &'static str = "decimal";

    fn nan() -> Self {
        Self::NAN
    }

    fn is_nan(&self) -> bool {
        self.0.is_none()
    }

    fn from_f64(value: f64) -> Self {
        Self(Decimal::from_f64(value))
    }

    fn from_i64(value: i64) -> Self {
        Self(Some(Decimal::from(value)))
    }

    fn to_f64(&self) -> f64 {
        self.0.and_then(|d| d.to_f64()).unwrap_or(f64::NAN)
    }

    fn abs(self) -> Self {
        Self(self.0.map(|d| d.abs()))
    }

    fn sqrt(self) -> Self {
        Self(self.0.and_then(|d| d.sqrt()))
    }
}
