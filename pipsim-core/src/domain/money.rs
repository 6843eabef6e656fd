//! Fixed-point money and price representation.
//!
//! All prices and balances are pippettes: the quote value scaled by 100 000
//! and stored as an integer. Money arithmetic never touches floating point;
//! `f64` appears only at the display/ingest boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Pippettes per whole quote unit.
pub const PIPPETTE_SCALE: i64 = 100_000;

/// A price or money amount in pippettes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pippettes(pub i64);

impl Pippettes {
    pub const ZERO: Pippettes = Pippettes(0);

    /// Convert a quote-unit value (e.g. 1.10000) to pippettes, rounding
    /// half away from zero.
    pub fn from_quote(quote: f64) -> Self {
        Pippettes((quote * PIPPETTE_SCALE as f64).round() as i64)
    }

    /// Quote-unit value, for display and ingest only.
    pub fn to_quote(self) -> f64 {
        self.0 as f64 / PIPPETTE_SCALE as f64
    }

    /// Reciprocal price in pippettes: `1 / quote` expressed back in
    /// pippettes, i.e. `10^10 / self`, rounded to nearest.
    ///
    /// Zero has no reciprocal and maps to zero rather than dividing by it.
    pub fn reciprocal(self) -> Pippettes {
        if self.0 == 0 {
            return Pippettes::ZERO;
        }
        let scale = PIPPETTE_SCALE * PIPPETTE_SCALE;
        let half = self.0.abs() / 2;
        Pippettes((scale + half * self.0.signum()) / self.0)
    }

    /// Money value of `units` at this price. Exact integer product.
    pub fn scaled_by(self, units: Units) -> Pippettes {
        Pippettes(self.0 * units.0)
    }

    /// Per-unit value of this aggregate amount, truncating toward zero at
    /// the pippette unit.
    pub fn per_unit(self, units: Units) -> Pippettes {
        if units.0 == 0 {
            return Pippettes::ZERO;
        }
        Pippettes(self.0 / units.0)
    }

    /// Value expressed in pips of the given pip size, for display.
    pub fn in_pips(self, pip: Pippettes) -> f64 {
        if pip.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / pip.0 as f64
    }

    pub fn abs(self) -> Pippettes {
        Pippettes(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Pippettes {
    type Output = Pippettes;
    fn add(self, rhs: Pippettes) -> Pippettes {
        Pippettes(self.0 + rhs.0)
    }
}

impl Sub for Pippettes {
    type Output = Pippettes;
    fn sub(self, rhs: Pippettes) -> Pippettes {
        Pippettes(self.0 - rhs.0)
    }
}

impl Neg for Pippettes {
    type Output = Pippettes;
    fn neg(self) -> Pippettes {
        Pippettes(-self.0)
    }
}

impl AddAssign for Pippettes {
    fn add_assign(&mut self, rhs: Pippettes) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Pippettes {
    fn sub_assign(&mut self, rhs: Pippettes) {
        self.0 -= rhs.0;
    }
}

impl Sum for Pippettes {
    fn sum<I: Iterator<Item = Pippettes>>(iter: I) -> Pippettes {
        iter.fold(Pippettes::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Display for Pippettes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PIPPETTE_SCALE;
        let frac = (self.0 % PIPPETTE_SCALE).abs();
        let sign = if self.0 < 0 && whole == 0 { "-" } else { "" };
        write!(f, "{sign}{whole}.{frac:05}")
    }
}

/// A signed instrument unit count. Positive is a buy; negative is a sell.
/// Instrument exposure itself is never negative — a short is a long on the
/// inverse pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Units(pub i64);

impl Units {
    pub fn is_buy(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Units {
        Units(self.0.abs())
    }
}

impl Neg for Units {
    type Output = Units;
    fn neg(self) -> Units {
        Units(-self.0)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
