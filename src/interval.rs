//! Numeric support domains: index/length intervals, length congruences,
//! and character ranges.
//!
//! These are the summary values produced by the forward passes and consumed
//! by the operation layer (lengths, substring offsets, pad amounts).

use std::fmt;

use crate::utils::gcd;

/// Bound of an interval: -∞, finite value, or +∞.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    pub fn as_finite(&self) -> Option<i64> {
        match self {
            Bound::Finite(n) => Some(*n),
            _ => None,
        }
    }

    pub fn add(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_add(*b)),
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::PosInf,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    pub fn add_scalar(&self, n: i64) -> Bound {
        self.add(&Bound::Finite(n))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PosInf => write!(f, "+inf"),
        }
    }
}

/// Interval `[low, high]`. Empty when `low > high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub low: Bound,
    pub high: Bound,
}

impl Interval {
    pub fn new(low: Bound, high: Bound) -> Self {
        if low > high {
            Self::bottom()
        } else {
            Self { low, high }
        }
    }

    pub fn constant(value: i64) -> Self {
        Self {
            low: Bound::Finite(value),
            high: Bound::Finite(value),
        }
    }

    pub fn finite(low: i64, high: i64) -> Self {
        Self::new(Bound::Finite(low), Bound::Finite(high))
    }

    /// `[n, +inf]`.
    pub fn at_least(n: i64) -> Self {
        Self {
            low: Bound::Finite(n),
            high: Bound::PosInf,
        }
    }

    pub fn top() -> Self {
        Self {
            low: Bound::NegInf,
            high: Bound::PosInf,
        }
    }

    pub fn bottom() -> Self {
        Self {
            low: Bound::PosInf,
            high: Bound::NegInf,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    pub fn contains(&self, value: i64) -> bool {
        !self.is_empty() && self.low <= Bound::Finite(value) && Bound::Finite(value) <= self.high
    }

    pub fn intersects(&self, other: &Interval) -> bool {
        !self.meet(other).is_empty()
    }

    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            low: self.low.min(other.low),
            high: self.high.max(other.high),
        }
    }

    pub fn meet(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        Interval::new(self.low.max(other.low), self.high.min(other.high))
    }

    /// Pointwise sum; empty operands stay empty.
    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        Interval {
            low: self.low.add(&other.low),
            high: self.high.add(&other.high),
        }
    }

    pub fn shift(&self, n: i64) -> Interval {
        if self.is_empty() {
            return *self;
        }
        Interval {
            low: self.low.add_scalar(n),
            high: self.high.add_scalar(n),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

/// Length congruence class: the set `{ remainder + k * divisor | k >= 0 }`.
///
/// A zero divisor denotes the exact value `remainder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Congruence {
    pub divisor: u64,
    pub remainder: u64,
}

impl Congruence {
    pub fn exactly(n: u64) -> Self {
        Self {
            divisor: 0,
            remainder: n,
        }
    }

    pub fn new(divisor: u64, remainder: u64) -> Self {
        let remainder = if divisor == 0 {
            remainder
        } else {
            remainder % divisor
        };
        Self { divisor, remainder }
    }

    pub fn join(&self, other: &Congruence) -> Congruence {
        let d = gcd(
            gcd(self.divisor, other.divisor),
            self.remainder.abs_diff(other.remainder),
        );
        Congruence::new(d, self.remainder)
    }

    pub fn shift(&self, n: u64) -> Congruence {
        Congruence::new(self.divisor, self.remainder.wrapping_add(n))
    }

    /// Does `n` belong to the class?
    pub fn admits(&self, n: u64) -> bool {
        if self.divisor == 0 {
            n == self.remainder
        } else {
            n % self.divisor == self.remainder
        }
    }
}

impl fmt::Display for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mod {})", self.remainder, self.divisor)
    }
}

/// Inclusive character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharInterval {
    pub low: char,
    pub high: char,
}

impl CharInterval {
    pub fn new(low: char, high: char) -> Self {
        assert!(low <= high, "Character interval {}..={} is empty", low, high);
        Self { low, high }
    }

    pub fn singleton(c: char) -> Self {
        Self { low: c, high: c }
    }

    pub fn is_singleton(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, c: char) -> bool {
        self.low <= c && c <= self.high
    }

    pub fn iter(&self) -> impl Iterator<Item = char> {
        self.low..=self.high
    }
}

impl fmt::Display for CharInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_singleton() {
            write!(f, "'{}'", self.low)
        } else {
            write!(f, "['{}'..'{}']", self.low, self.high)
        }
    }
}
