//! Currency pairs, canonical direction, and per-pair constants.

use super::money::Pippettes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currencies the simulator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Eur,
    Gbp,
    Aud,
    Nzd,
    Usd,
    Cad,
    Chf,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Aud => "AUD",
            Currency::Nzd => "NZD",
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Jpy => "JPY",
        }
    }

    /// Market-convention quoting priority: a pair is quoted with the
    /// higher-priority currency as base (EUR/USD, USD/JPY, GBP/CHF, ...).
    fn priority(self) -> u8 {
        match self {
            Currency::Eur => 0,
            Currency::Gbp => 1,
            Currency::Aud => 2,
            Currency::Nzd => 3,
            Currency::Usd => 4,
            Currency::Cad => 5,
            Currency::Chf => 6,
            Currency::Jpy => 7,
        }
    }
}

impl FromStr for Currency {
    type Err = ParsePairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "AUD" => Ok(Currency::Aud),
            "NZD" => Ok(Currency::Nzd),
            "USD" => Ok(Currency::Usd),
            "CAD" => Ok(Currency::Cad),
            "CHF" => Ok(Currency::Chf),
            "JPY" => Ok(Currency::Jpy),
            other => Err(ParsePairError::UnknownCurrency(other.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed currency pair: price is quote units per base unit.
///
/// Exactly one direction of each pair is canonical; candle history is stored
/// only for that direction and the other is derived by inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The reciprocal-quoted counterpart.
    pub fn inverse(self) -> CurrencyPair {
        CurrencyPair { base: self.quote, quote: self.base }
    }

    /// True if this direction is the market-convention quote direction.
    pub fn is_canonical(self) -> bool {
        self.base.priority() < self.quote.priority()
    }

    /// The canonical direction of this pair.
    pub fn canonical(self) -> CurrencyPair {
        if self.is_canonical() {
            self
        } else {
            self.inverse()
        }
    }

    /// Conventional pip size in pippettes: 0.01 for JPY-quoted pairs,
    /// 0.0001 otherwise. Used only for human-readable profit display.
    pub fn pip(self) -> Pippettes {
        match self.quote {
            Currency::Jpy => Pippettes(1000),
            _ => Pippettes(10),
        }
    }

    /// Fixed half-spread in pippettes, the only execution friction modeled:
    /// buys fill at mid + half-spread, sells at mid - half-spread.
    pub fn half_spread(self) -> Pippettes {
        Pippettes(self.pip().0 / 2)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = ParsePairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| ParsePairError::Malformed(s.to_string()))?;
        let base: Currency = base.parse()?;
        let quote: Currency = quote.parse()?;
        if base == quote {
            return Err(ParsePairError::SameCurrency(s.to_string()));
        }
        Ok(CurrencyPair { base, quote })
    }
}

#[derive(Debug, Error)]
pub enum ParsePairError {
    #[error("unknown currency '{0}'")]
    UnknownCurrency(String),

    #[error("malformed pair '{0}', expected BASE/QUOTE")]
    Malformed(String),

    #[error("pair '{0}' quotes a currency against itself")]
    SameCurrency(String),
}
