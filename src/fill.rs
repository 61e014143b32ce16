// 5.0: fill evaluator. decides whether an observed trade would have hit one of our
// synthetic quotes. pure: wallet and stats are touched by the session, never here.
//
// execution price is always clamped to the less favourable of quoted vs traded,
// so the simulation never books a better fill than the market printed.

use crate::quote::QuotePair;
use crate::types::{Side, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillOutcome {
    /// Our ask was hit: base leaves the wallet.
    Sold {
        volume: Decimal,
        price: Decimal,
        last_price: Decimal,
    },
    /// Our bid was lifted: base enters the wallet.
    Bought {
        volume: Decimal,
        price: Decimal,
        last_price: Decimal,
    },
    /// Trade printed between our quotes.
    NoFill { last_price: Decimal },
}

impl FillOutcome {
    pub fn last_price(&self) -> Decimal {
        match self {
            FillOutcome::Sold { last_price, .. }
            | FillOutcome::Bought { last_price, .. }
            | FillOutcome::NoFill { last_price } => *last_price,
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            FillOutcome::Sold { .. } => Some(Side::Sell),
            FillOutcome::Bought { .. } => Some(Side::Buy),
            FillOutcome::NoFill { .. } => None,
        }
    }

    pub fn fill_price(&self) -> Option<Decimal> {
        match self {
            FillOutcome::Sold { price, .. } | FillOutcome::Bought { price, .. } => Some(*price),
            FillOutcome::NoFill { .. } => None,
        }
    }

    /// Filled volume, zero for a no-fill.
    pub fn volume(&self) -> Decimal {
        match self {
            FillOutcome::Sold { volume, .. } | FillOutcome::Bought { volume, .. } => *volume,
            FillOutcome::NoFill { .. } => Decimal::ZERO,
        }
    }

    /// A fill that moves nothing, e.g. against zero-volume startup quotes.
    pub fn is_empty(&self) -> bool {
        self.volume().is_zero()
    }
}

/// Classify a trade against the current quotes. None when the trade carries no
/// usable price (no base volume).
pub fn evaluate(quotes: &QuotePair, trade: &Trade) -> Option<FillOutcome> {
    let last_price = trade.price()?;

    let outcome = if last_price >= quotes.ask.price {
        FillOutcome::Sold {
            volume: quotes.ask.volume.min(trade.base),
            price: quotes.ask.price.min(last_price),
            last_price,
        }
    } else if last_price <= quotes.bid.price {
        // buy side mirrors the sell clamp: the lower of quoted and traded
        FillOutcome::Bought {
            volume: quotes.bid.volume.min(trade.base),
            price: quotes.bid.price.min(last_price),
            last_price,
        }
    } else {
        FillOutcome::NoFill { last_price }
    };

    Some(outcome)
}
