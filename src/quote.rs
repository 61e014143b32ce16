//! Synthetic quotes and the inventory-skew re-quoter.
//!
//! After every tick both resting orders are rebuilt from scratch around the
//! last traded price. The wallet's mark-to-market split drives both price
//! and size:
//!
//! - ask = last + spread * counter_ratio, sized order_volume * base_ratio
//! - bid = last - spread * base_ratio, sized order_volume * counter_ratio
//!
//! Holding mostly base pulls the ask in toward the last price and pushes the
//! bid away, so the session leans toward selling back to balance.

use crate::market::MarketConfig;
use crate::types::{div_scaled, RATIO_SCALE};
use crate::wallet::Wallet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One synthetic resting order. zero volume means nothing is resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub volume: Decimal,
}

impl Quote {
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }

    pub fn empty(price: Decimal) -> Self {
        Self::new(price, Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.volume.is_zero()
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.volume, self.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePair {
    pub ask: Quote,
    pub bid: Quote,
}

impl QuotePair {
    pub fn new(ask: Quote, bid: Quote) -> Self {
        Self { ask, bid }
    }

    /// Zero-volume quotes at reference prices. used before the first tick.
    pub fn seed(ask_price: Decimal, bid_price: Decimal) -> Self {
        Self::new(Quote::empty(ask_price), Quote::empty(bid_price))
    }

    /// Degenerate pair for a tick with nothing to value: both sides at the
    /// last price, nothing resting.
    pub fn idle(last_price: Decimal) -> Self {
        Self::seed(last_price, last_price)
    }

    /// (ask - bid) / last * 100 at 4 dp.
    pub fn spread_pct(&self, last_price: Decimal) -> Option<Decimal> {
        let width = self.ask.price.checked_sub(self.bid.price)?;
        div_scaled(width, last_price, 4)?.checked_mul(Decimal::ONE_HUNDRED)
    }
}

/// Mark-to-market split of a wallet at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub base_value: Decimal,
    pub total_value: Decimal,
    pub base_ratio: Decimal,
    pub counter_ratio: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequoteError {
    #[error("Wallet has zero mark-to-market value, cannot split inventory")]
    DivisionByZero,

    #[error("Wallet value or quotes overflow at this price")]
    Overflow,
}

// 1: value both legs, 2: split into ratios. the counter ratio is the
// complement of the base ratio so the pair always sums to one.
pub fn valuation(wallet: &Wallet, last_price: Decimal) -> Result<Valuation, RequoteError> {
    let base_value = wallet
        .base
        .checked_mul(last_price)
        .ok_or(RequoteError::Overflow)?;
    let total_value = base_value
        .checked_add(wallet.counter)
        .ok_or(RequoteError::Overflow)?;
    if total_value.is_zero() {
        return Err(RequoteError::DivisionByZero);
    }

    // with legs of opposite sign the ratio itself can blow past Decimal::MAX
    let base_ratio =
        div_scaled(base_value, total_value, RATIO_SCALE).ok_or(RequoteError::Overflow)?;
    let counter_ratio = Decimal::ONE
        .checked_sub(base_ratio)
        .ok_or(RequoteError::Overflow)?;

    Ok(Valuation {
        base_value,
        total_value,
        base_ratio,
        counter_ratio,
    })
}

// 3, 4: skew both quotes by the ratios. sizes are floored at zero so a short
// leg rests nothing on that side. prices are left as computed: a bid below
// zero can never be reached by a trade.
pub fn quotes_for(
    last_price: Decimal,
    valuation: &Valuation,
    config: &MarketConfig,
) -> Result<QuotePair, RequoteError> {
    let skew = |ratio: Decimal| config.spread.checked_mul(ratio).ok_or(RequoteError::Overflow);
    let size = |ratio: Decimal| {
        config
            .order_volume
            .checked_mul(ratio)
            .map(floor_zero)
            .ok_or(RequoteError::Overflow)
    };

    let ask_price = last_price
        .checked_add(skew(valuation.counter_ratio)?)
        .ok_or(RequoteError::Overflow)?;
    let bid_price = last_price
        .checked_sub(skew(valuation.base_ratio)?)
        .ok_or(RequoteError::Overflow)?;

    Ok(QuotePair::new(
        Quote::new(ask_price, size(valuation.base_ratio)?),
        Quote::new(bid_price, size(valuation.counter_ratio)?),
    ))
}

/// Next quote pair for a wallet at the last traded price.
pub fn requote(
    last_price: Decimal,
    wallet: &Wallet,
    config: &MarketConfig,
) -> Result<QuotePair, RequoteError> {
    let valuation = valuation(wallet, last_price)?;
    quotes_for(last_price, &valuation, config)
}

fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
