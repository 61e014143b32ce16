//! Market configuration.
//!
//! Each subscribed market gets its own static tuning: how wide to quote,
//! how much to quote, and what the paper wallet starts with. Configs are
//! immutable once a session is built from them.

use crate::types::MarketId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static market configuration (immutable after creation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Price gap scaled by the inventory ratios around the last price
    pub spread: Decimal,
    /// Total size split between ask and bid
    pub order_volume: Decimal,
    /// Starting base balance of the paper wallet
    pub base_balance: Decimal,
    /// Starting counter balance of the paper wallet
    pub counter_balance: Decimal,
}

impl MarketConfig {
    pub fn new(
        spread: Decimal,
        order_volume: Decimal,
        base_balance: Decimal,
        counter_balance: Decimal,
    ) -> Self {
        Self {
            spread,
            order_volume,
            base_balance,
            counter_balance,
        }
    }

    // crypto/BTC pairs
    pub fn bch_xbt() -> Self {
        Self::new(dec!(0.000035), dec!(15), dec!(150), dec!(1))
    }

    pub fn eth_xbt() -> Self {
        Self::new(dec!(0.00035), dec!(1.5), dec!(15), dec!(1))
    }

    pub fn ltc_xbt() -> Self {
        Self::new(dec!(0.00001), dec!(45), dec!(450), dec!(1))
    }

    pub fn xrp_xbt() -> Self {
        Self::new(dec!(0.00000006), dec!(7000), dec!(70000), dec!(1))
    }

    // crypto/stable pairs
    pub fn eth_usdc() -> Self {
        Self::new(dec!(10), dec!(0.05), dec!(1), dec!(2000))
    }

    pub fn xbt_usdc() -> Self {
        Self::new(dec!(150), dec!(0.1), dec!(1), dec!(30000))
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.spread < Decimal::ZERO {
            return Err(MarketError::NegativeSpread(self.spread));
        }
        if self.order_volume <= Decimal::ZERO {
            return Err(MarketError::NonPositiveVolume(self.order_volume));
        }
        Ok(())
    }
}

/// Per-market configs keyed by pair. passed explicitly into the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketTable {
    markets: BTreeMap<MarketId, MarketConfig>,
}

impl MarketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuning for the pairs the simulator ships with.
    pub fn defaults() -> Self {
        let mut table = Self::new();
        table.insert(MarketId::new("BCHXBT"), MarketConfig::bch_xbt());
        table.insert(MarketId::new("ETHXBT"), MarketConfig::eth_xbt());
        table.insert(MarketId::new("LTCXBT"), MarketConfig::ltc_xbt());
        table.insert(MarketId::new("XRPXBT"), MarketConfig::xrp_xbt());
        table.insert(MarketId::new("ETHUSDC"), MarketConfig::eth_usdc());
        table.insert(MarketId::new("XBTUSDC"), MarketConfig::xbt_usdc());
        table
    }

    pub fn insert(&mut self, market: MarketId, config: MarketConfig) -> Option<MarketConfig> {
        self.markets.insert(market, config)
    }

    pub fn get(&self, market: &MarketId) -> Option<&MarketConfig> {
        self.markets.get(market)
    }

    pub fn require(&self, market: &MarketId) -> Result<&MarketConfig, MarketError> {
        self.markets
            .get(market)
            .ok_or_else(|| MarketError::MarketNotFound(market.clone()))
    }

    pub fn contains(&self, market: &MarketId) -> bool {
        self.markets.contains_key(market)
    }

    pub fn market_ids(&self) -> impl Iterator<Item = &MarketId> {
        self.markets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MarketId, &MarketConfig)> {
        self.markets.iter()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Overlay another table on top of this one.
    pub fn merge(&mut self, other: MarketTable) {
        self.markets.extend(other.markets);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("Market {0} has no configuration")]
    MarketNotFound(MarketId),

    #[error("Spread {0} must not be negative")]
    NegativeSpread(Decimal),

    #[error("Order volume {0} must be positive")]
    NonPositiveVolume(Decimal),
}
