//! Value ranges with open/closed ends.
//!
//! A [`ValueRange`] tracks the provable bounds of a variable or of a derived
//! expression. Tightening through [`ValueRange::intersect_with`] (and the
//! `ls`/`leq`/`gr`/`geq`/`eq_value` sugar) is monotonic: a range never widens.
//! An empty range is a valid value. It is reported as infeasibility by the
//! model, never by panicking here.
//!
//! The arithmetic helpers (`add`, `scale`, `mul`, ...) build new ranges and are
//! used to propagate bounds through polynomials.

use num_traits::{Num, ToPrimitive};
use std::cmp::Ordering;
use std::fmt;

/// Numeric types a [`ValueRange`] can be built over.
pub trait RangeValue: Copy + PartialOrd + fmt::Debug + fmt::Display + Num {}

impl<T> RangeValue for T where T: Copy + PartialOrd + fmt::Debug + fmt::Display + Num {}

/// One end of a range: a finite value or an infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bound<T> {
    NegativeInfinity,
    Value(T),
    PositiveInfinity,
}

impl<T: RangeValue> Bound<T> {
    /// The finite value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Bound::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_finite(self) -> bool {
        matches!(self, Bound::Value(_))
    }

    fn signum(self) -> Ordering {
        match self {
            Bound::NegativeInfinity => Ordering::Less,
            Bound::PositiveInfinity => Ordering::Greater,
            Bound::Value(value) => value.partial_cmp(&T::zero()).unwrap_or(Ordering::Equal),
        }
    }

    fn infinity_with_sign(sign: Ordering) -> Self {
        match sign {
            Ordering::Less => Bound::NegativeInfinity,
            Ordering::Greater => Bound::PositiveInfinity,
            Ordering::Equal => Bound::Value(T::zero()),
        }
    }

    fn add_as_lower(self, other: Self) -> Self {
        match (self, other) {
            (Bound::NegativeInfinity, _) | (_, Bound::NegativeInfinity) => Bound::NegativeInfinity,
            (Bound::PositiveInfinity, _) | (_, Bound::PositiveInfinity) => Bound::PositiveInfinity,
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a + b),
        }
    }

    fn add_as_upper(self, other: Self) -> Self {
        match (self, other) {
            (Bound::PositiveInfinity, _) | (_, Bound::PositiveInfinity) => Bound::PositiveInfinity,
            (Bound::NegativeInfinity, _) | (_, Bound::NegativeInfinity) => Bound::NegativeInfinity,
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a + b),
        }
    }

    /// Extended-real product with `0 * inf = 0`.
    fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a * b),
            _ => {
                let sign = match (self.signum(), other.signum()) {
                    (Ordering::Equal, _) | (_, Ordering::Equal) => Ordering::Equal,
                    (a, b) if a == b => Ordering::Greater,
                    _ => Ordering::Less,
                };
                Self::infinity_with_sign(sign)
            }
        }
    }
}

impl<T: RangeValue> PartialOrd for Bound<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Bound::NegativeInfinity, Bound::NegativeInfinity)
            | (Bound::PositiveInfinity, Bound::PositiveInfinity) => Some(Ordering::Equal),
            (Bound::NegativeInfinity, _) | (_, Bound::PositiveInfinity) => Some(Ordering::Less),
            (Bound::PositiveInfinity, _) | (_, Bound::NegativeInfinity) => Some(Ordering::Greater),
            (Bound::Value(a), Bound::Value(b)) => a.partial_cmp(b),
        }
    }
}

impl Bound<f64> {
    /// Map an `f64` (possibly infinite) onto a bound.
    pub fn from_f64(value: f64) -> Self {
        if value == f64::NEG_INFINITY {
            Bound::NegativeInfinity
        } else if value == f64::INFINITY {
            Bound::PositiveInfinity
        } else {
            Bound::Value(value)
        }
    }
}

impl<T: RangeValue + ToPrimitive> Bound<T> {
    pub fn to_f64(self) -> f64 {
        match self {
            Bound::NegativeInfinity => f64::NEG_INFINITY,
            Bound::PositiveInfinity => f64::INFINITY,
            Bound::Value(value) => value.to_f64().unwrap_or(f64::NAN),
        }
    }
}

/// Whether a range end includes its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interval {
    Open,
    Closed,
}

impl Interval {
    /// Open wins: the combination of two ends is closed only if both are.
    pub fn meet(self, other: Interval) -> Interval {
        if self == Interval::Closed && other == Interval::Closed {
            Interval::Closed
        } else {
            Interval::Open
        }
    }

    /// Closed wins.
    pub fn join(self, other: Interval) -> Interval {
        if self == Interval::Closed || other == Interval::Closed {
            Interval::Closed
        } else {
            Interval::Open
        }
    }
}

/// Errors raised when building a range from raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    NotANumber,
    Empty,
}

impl RangeError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            RangeError::NotANumber => "RANGE_NOT_A_NUMBER",
            RangeError::Empty => "RANGE_EMPTY",
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::NotANumber => write!(f, "[{}] Range bound is NaN", self.code()),
            RangeError::Empty => write!(f, "[{}] Range is empty", self.code()),
        }
    }
}

impl std::error::Error for RangeError {}

/// Lower/upper bound pair with open/closed flags.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueRange<T> {
    lower: Bound<T>,
    lower_interval: Interval,
    upper: Bound<T>,
    upper_interval: Interval,
}

impl<T: RangeValue> ValueRange<T> {
    /// Build a range. Infinite ends are always open.
    pub fn new(
        lower: Bound<T>,
        lower_interval: Interval,
        upper: Bound<T>,
        upper_interval: Interval,
    ) -> Self {
        Self {
            lower,
            lower_interval: if lower.is_finite() {
                lower_interval
            } else {
                Interval::Open
            },
            upper,
            upper_interval: if upper.is_finite() {
                upper_interval
            } else {
                Interval::Open
            },
        }
    }

    /// `[lower, upper]`
    pub fn closed(lower: T, upper: T) -> Self {
        Self::new(
            Bound::Value(lower),
            Interval::Closed,
            Bound::Value(upper),
            Interval::Closed,
        )
    }

    /// `(lower, upper)`
    pub fn open(lower: T, upper: T) -> Self {
        Self::new(
            Bound::Value(lower),
            Interval::Open,
            Bound::Value(upper),
            Interval::Open,
        )
    }

    /// `[value, value]`
    pub fn point(value: T) -> Self {
        Self::closed(value, value)
    }

    /// `(-inf, +inf)`
    pub fn full() -> Self {
        Self::new(
            Bound::NegativeInfinity,
            Interval::Open,
            Bound::PositiveInfinity,
            Interval::Open,
        )
    }

    /// `[lower, +inf)`
    pub fn at_least(lower: T) -> Self {
        Self::new(
            Bound::Value(lower),
            Interval::Closed,
            Bound::PositiveInfinity,
            Interval::Open,
        )
    }

    /// `(-inf, upper]`
    pub fn at_most(upper: T) -> Self {
        Self::new(
            Bound::NegativeInfinity,
            Interval::Open,
            Bound::Value(upper),
            Interval::Closed,
        )
    }

    /// The canonical empty range.
    pub fn empty() -> Self {
        Self {
            lower: Bound::PositiveInfinity,
            lower_interval: Interval::Open,
            upper: Bound::NegativeInfinity,
            upper_interval: Interval::Open,
        }
    }

    pub fn lower(&self) -> Bound<T> {
        self.lower
    }

    pub fn upper(&self) -> Bound<T> {
        self.upper
    }

    pub fn lower_interval(&self) -> Interval {
        self.lower_interval
    }

    pub fn upper_interval(&self) -> Interval {
        self.upper_interval
    }

    pub fn is_empty(&self) -> bool {
        match self.lower.partial_cmp(&self.upper) {
            Some(Ordering::Less) => false,
            Some(Ordering::Equal) => !(self.lower.is_finite()
                && self.lower_interval == Interval::Closed
                && self.upper_interval == Interval::Closed),
            Some(Ordering::Greater) | None => true,
        }
    }

    pub fn contains(&self, value: T) -> bool {
        let above_lower = match self.lower {
            Bound::NegativeInfinity => true,
            Bound::PositiveInfinity => false,
            Bound::Value(lower) => match self.lower_interval {
                Interval::Closed => value >= lower,
                Interval::Open => value > lower,
            },
        };
        let below_upper = match self.upper {
            Bound::PositiveInfinity => true,
            Bound::NegativeInfinity => false,
            Bound::Value(upper) => match self.upper_interval {
                Interval::Closed => value <= upper,
                Interval::Open => value < upper,
            },
        };
        above_lower && below_upper
    }

    /// The single value of a degenerate `[v, v]` range.
    pub fn fixed_value(&self) -> Option<T> {
        match (self.lower, self.upper) {
            (Bound::Value(lower), Bound::Value(upper))
                if lower == upper
                    && self.lower_interval == Interval::Closed
                    && self.upper_interval == Interval::Closed =>
            {
                Some(lower)
            }
            _ => None,
        }
    }

    /// `Err(RangeError::Empty)` when no value satisfies the range.
    pub fn non_empty(self) -> Result<Self, RangeError> {
        if self.is_empty() {
            Err(RangeError::Empty)
        } else {
            Ok(self)
        }
    }

    /// True when every value of `self` also lies in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        let lower_ok = match self.lower.partial_cmp(&other.lower) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => {
                other.lower_interval == Interval::Closed || self.lower_interval == Interval::Open
            }
            _ => false,
        };
        let upper_ok = match self.upper.partial_cmp(&other.upper) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => {
                other.upper_interval == Interval::Closed || self.upper_interval == Interval::Open
            }
            _ => false,
        };
        lower_ok && upper_ok
    }

    /// Narrow this range to its overlap with `other`.
    ///
    /// Returns `false` when the result is empty. The range is never widened,
    /// so applying the same intersection twice equals applying it once.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        let lower = match self.lower.partial_cmp(&other.lower) {
            Some(Ordering::Greater) => Some((self.lower, self.lower_interval)),
            Some(Ordering::Less) => Some((other.lower, other.lower_interval)),
            Some(Ordering::Equal) => {
                Some((self.lower, self.lower_interval.meet(other.lower_interval)))
            }
            None => None,
        };
        let upper = match self.upper.partial_cmp(&other.upper) {
            Some(Ordering::Less) => Some((self.upper, self.upper_interval)),
            Some(Ordering::Greater) => Some((other.upper, other.upper_interval)),
            Some(Ordering::Equal) => {
                Some((self.upper, self.upper_interval.meet(other.upper_interval)))
            }
            None => None,
        };
        match (lower, upper) {
            (Some((lower, lower_interval)), Some((upper, upper_interval))) => {
                *self = Self::new(lower, lower_interval, upper, upper_interval);
            }
            _ => *self = Self::empty(),
        }
        !self.is_empty()
    }

    /// Pure variant of [`ValueRange::intersect_with`].
    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = *self;
        result.intersect_with(other);
        result
    }

    /// Keep values `< value`.
    pub fn ls(&mut self, value: T) -> bool {
        self.intersect_with(&Self::new(
            Bound::NegativeInfinity,
            Interval::Open,
            Bound::Value(value),
            Interval::Open,
        ))
    }

    /// Keep values `<= value`.
    pub fn leq(&mut self, value: T) -> bool {
        self.intersect_with(&Self::at_most(value))
    }

    /// Keep values `> value`.
    pub fn gr(&mut self, value: T) -> bool {
        self.intersect_with(&Self::new(
            Bound::Value(value),
            Interval::Open,
            Bound::PositiveInfinity,
            Interval::Open,
        ))
    }

    /// Keep values `>= value`.
    pub fn geq(&mut self, value: T) -> bool {
        self.intersect_with(&Self::at_least(value))
    }

    /// Keep only `value`.
    pub fn eq_value(&mut self, value: T) -> bool {
        self.intersect_with(&Self::point(value))
    }

    /// Smallest range holding both operands.
    pub fn union_hull(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let (lower, lower_interval) = match self.lower.partial_cmp(&other.lower) {
            Some(Ordering::Less) => (self.lower, self.lower_interval),
            Some(Ordering::Greater) => (other.lower, other.lower_interval),
            _ => (self.lower, self.lower_interval.join(other.lower_interval)),
        };
        let (upper, upper_interval) = match self.upper.partial_cmp(&other.upper) {
            Some(Ordering::Greater) => (self.upper, self.upper_interval),
            Some(Ordering::Less) => (other.upper, other.upper_interval),
            _ => (self.upper, self.upper_interval.join(other.upper_interval)),
        };
        Self::new(lower, lower_interval, upper, upper_interval)
    }

    /// Minkowski sum.
    pub fn add(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Self::new(
            self.lower.add_as_lower(other.lower),
            self.lower_interval.meet(other.lower_interval),
            self.upper.add_as_upper(other.upper),
            self.upper_interval.meet(other.upper_interval),
        )
    }

    /// Shift both ends by a constant.
    pub fn shift(&self, offset: T) -> Self {
        self.add(&Self::point(offset))
    }

    /// Multiply by a scalar; a negative factor swaps the ends.
    pub fn scale(&self, factor: T) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        let by = Bound::Value(factor);
        match factor.partial_cmp(&T::zero()) {
            Some(Ordering::Greater) => Self::new(
                self.lower.mul(by),
                self.lower_interval,
                self.upper.mul(by),
                self.upper_interval,
            ),
            Some(Ordering::Less) => Self::new(
                self.upper.mul(by),
                self.upper_interval,
                self.lower.mul(by),
                self.lower_interval,
            ),
            _ => Self::point(T::zero()),
        }
    }

    /// Closed hull of all endpoint products.
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let products = [
            self.lower.mul(other.lower),
            self.lower.mul(other.upper),
            self.upper.mul(other.lower),
            self.upper.mul(other.upper),
        ];
        let mut lower = products[0];
        let mut upper = products[0];
        for product in &products[1..] {
            if product.partial_cmp(&lower) == Some(Ordering::Less) {
                lower = *product;
            }
            if product.partial_cmp(&upper) == Some(Ordering::Greater) {
                upper = *product;
            }
        }
        Self::new(lower, Interval::Closed, upper, Interval::Closed)
    }

    /// Range of `x * x` for `x` in this range.
    pub fn square(&self) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        let lower_sq = self.lower.mul(self.lower);
        let upper_sq = self.upper.mul(self.upper);
        let high = if lower_sq.partial_cmp(&upper_sq) == Some(Ordering::Greater) {
            lower_sq
        } else {
            upper_sq
        };
        if self.contains(T::zero()) {
            return Self::new(Bound::Value(T::zero()), Interval::Closed, high, Interval::Closed);
        }
        let low = if lower_sq.partial_cmp(&upper_sq) == Some(Ordering::Greater) {
            upper_sq
        } else {
            lower_sq
        };
        Self::new(low, Interval::Closed, high, Interval::Closed)
    }
}

impl<T: RangeValue + std::ops::Neg<Output = T>> ValueRange<T> {
    /// Mirror the range around zero.
    pub fn neg(&self) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        let flip = |bound: Bound<T>| match bound {
            Bound::NegativeInfinity => Bound::PositiveInfinity,
            Bound::PositiveInfinity => Bound::NegativeInfinity,
            Bound::Value(value) => Bound::Value(-value),
        };
        Self::new(
            flip(self.upper),
            self.upper_interval,
            flip(self.lower),
            self.lower_interval,
        )
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }
}

impl<T: RangeValue + ToPrimitive> ValueRange<T> {
    pub fn lower_f64(&self) -> f64 {
        self.lower.to_f64()
    }

    pub fn upper_f64(&self) -> f64 {
        self.upper.to_f64()
    }
}

impl ValueRange<f64> {
    /// Closed range from raw `f64` bounds; infinities map to open ends.
    pub fn from_f64_bounds(lower: f64, upper: f64) -> Result<Self, RangeError> {
        if lower.is_nan() || upper.is_nan() {
            return Err(RangeError::NotANumber);
        }
        Ok(Self::new(
            Bound::from_f64(lower),
            Interval::Closed,
            Bound::from_f64(upper),
            Interval::Closed,
        ))
    }

    /// `upper - lower`, infinite when either end is.
    pub fn width(&self) -> f64 {
        self.upper_f64() - self.lower_f64()
    }

    /// Both ends finite.
    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }
}

impl<T: RangeValue> fmt::Display for ValueRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let open = match self.lower_interval {
            Interval::Closed => '[',
            Interval::Open => '(',
        };
        let close = match self.upper_interval {
            Interval::Closed => ']',
            Interval::Open => ')',
        };
        let render = |bound: Bound<T>| match bound {
            Bound::NegativeInfinity => "-inf".to_string(),
            Bound::PositiveInfinity => "inf".to_string(),
            Bound::Value(value) => value.to_string(),
        };
        write!(f, "{open}{}, {}{close}", render(self.lower), render(self.upper))
    }
}
