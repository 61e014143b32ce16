// 1.0: all the primitives live here. market ids, trades, timestamps, scaled division.
// amounts stay plain Decimal: base and counter legs are both just quantities.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale used when deriving a trade price from its legs.
pub const PRICE_SCALE: u32 = 8;

/// Scale used for inventory ratios.
pub const RATIO_SCALE: u32 = 9;

// pair code as the exchange spells it, e.g. XBTUSDC
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub String);

impl MarketId {
    pub fn new(pair: impl Into<String>) -> Self {
        Self(pair.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MarketId {
    fn from(pair: &str) -> Self {
        Self::new(pair)
    }
}

// Sell = our ask got hit. Buy = our bid got lifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "bought"),
            Side::Sell => write!(f, "sold"),
        }
    }
}

// 1.1: one observed market trade. price is derived from the legs, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub base: Decimal,
    pub counter: Decimal,
}

impl Trade {
    pub fn new(base: Decimal, counter: Decimal) -> Self {
        Self { base, counter }
    }

    /// counter / base at [`PRICE_SCALE`]. None for a trade with no base volume
    /// or no counter value.
    pub fn price(&self) -> Option<Decimal> {
        if self.base <= Decimal::ZERO || self.counter <= Decimal::ZERO {
            return None;
        }
        div_scaled(self.counter, self.base, PRICE_SCALE)
    }
}

// 1.2: fixed-point division. truncates toward zero at the given scale,
// None when the divisor is zero.
pub fn div_scaled(numerator: Decimal, divisor: Decimal, scale: u32) -> Option<Decimal> {
    numerator
        .checked_div(divisor)
        .map(|q| q.round_dp_with_strategy(scale, RoundingStrategy::ToZero))
}

// 1.3: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
