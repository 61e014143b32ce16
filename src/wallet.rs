//! Paper wallet and cumulative trade statistics.
//!
//! The wallet holds the two legs of one market. Nothing stops a leg from
//! going negative: this is paper trading and the quoting rule is what pulls
//! inventory back, not a balance check.

use crate::market::MarketConfig;
use crate::types::{div_scaled, PRICE_SCALE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub base: Decimal,
    pub counter: Decimal,
}

impl Wallet {
    pub fn new(base: Decimal, counter: Decimal) -> Self {
        Self { base, counter }
    }

    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.base_balance, config.counter_balance)
    }

    // base out, counter in. returns the counter value received.
    // on overflow the wallet is left as it was
    pub fn sell(&mut self, volume: Decimal, price: Decimal) -> Result<Decimal, WalletError> {
        let value = volume.checked_mul(price).ok_or(WalletError::Overflow)?;
        let base = self.base.checked_sub(volume).ok_or(WalletError::Overflow)?;
        let counter = self.counter.checked_add(value).ok_or(WalletError::Overflow)?;
        *self = Self::new(base, counter);
        Ok(value)
    }

    // base in, counter out. returns the counter value spent
    pub fn buy(&mut self, volume: Decimal, price: Decimal) -> Result<Decimal, WalletError> {
        let value = volume.checked_mul(price).ok_or(WalletError::Overflow)?;
        let base = self.base.checked_add(volume).ok_or(WalletError::Overflow)?;
        let counter = self.counter.checked_sub(value).ok_or(WalletError::Overflow)?;
        *self = Self::new(base, counter);
        Ok(value)
    }

    /// Mark-to-market value in counter terms. None if it does not fit a Decimal.
    pub fn mark_to_market(&self, price: Decimal) -> Option<Decimal> {
        self.base.checked_mul(price)?.checked_add(self.counter)
    }
}

/// Running totals. every field only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_bought: Decimal,
    pub total_sold: Decimal,
    pub total_spent: Decimal,
    pub total_earned: Decimal,
    pub fills: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sell(&mut self, volume: Decimal, value: Decimal) -> Result<(), WalletError> {
        let sold = self.total_sold.checked_add(volume).ok_or(WalletError::Overflow)?;
        let earned = self.total_earned.checked_add(value).ok_or(WalletError::Overflow)?;
        self.total_sold = sold;
        self.total_earned = earned;
        self.fills += 1;
        Ok(())
    }

    pub fn record_buy(&mut self, volume: Decimal, value: Decimal) -> Result<(), WalletError> {
        let bought = self.total_bought.checked_add(volume).ok_or(WalletError::Overflow)?;
        let spent = self.total_spent.checked_add(value).ok_or(WalletError::Overflow)?;
        self.total_bought = bought;
        self.total_spent = spent;
        self.fills += 1;
        Ok(())
    }

    pub fn average_buy(&self) -> Option<Decimal> {
        div_scaled(self.total_spent, self.total_bought, PRICE_SCALE)
    }

    pub fn average_sell(&self) -> Option<Decimal> {
        div_scaled(self.total_earned, self.total_sold, PRICE_SCALE)
    }

    /// Averages and realized return, only once both sides have traded.
    pub fn performance(&self) -> Option<Performance> {
        if self.total_bought.is_zero() || self.total_sold.is_zero() {
            return None;
        }
        let average_buy = self.average_buy()?;
        let average_sell = self.average_sell()?;
        let edge = average_sell.checked_sub(average_buy)?;
        Some(Performance {
            average_buy,
            average_sell,
            realized_return: self.total_bought.checked_mul(edge)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub average_buy: Decimal,
    pub average_sell: Decimal,
    // bought volume times the average sell/buy edge
    pub realized_return: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Fill does not fit in the wallet without overflow")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sell_moves_base_to_counter() {
        let mut wallet = Wallet::new(dec!(5), dec!(5));
        let value = wallet.sell(dec!(2), dec!(101)).unwrap();

        assert_eq!(value, dec!(202));
        assert_eq!(wallet.base, dec!(3));
        assert_eq!(wallet.counter, dec!(207));
    }

    #[test]
    fn buy_can_go_negative() {
        let mut wallet = Wallet::new(dec!(0), dec!(10));
        let value = wallet.buy(dec!(1), dec!(100)).unwrap();

        assert_eq!(value, dec!(100));
        assert_eq!(wallet.base, dec!(1));
        assert_eq!(wallet.counter, dec!(-90));
    }

    #[test]
    fn wallet_from_config() {
        let wallet = Wallet::from_config(&MarketConfig::xbt_usdc());
        assert_eq!(wallet.base, dec!(1));
        assert_eq!(wallet.counter, dec!(30000));
    }

    #[test]
    fn mark_to_market() {
        let wallet = Wallet::new(dec!(5), dec!(5));
        assert_eq!(wallet.mark_to_market(dec!(101)), Some(dec!(510)));
    }

    #[test]
    fn performance_needs_both_sides() {
        let mut stats = Stats::new();
        assert!(stats.performance().is_none());

        stats.record_buy(dec!(2), dec!(200)).unwrap();
        assert!(stats.performance().is_none());
        assert_eq!(stats.average_buy(), Some(dec!(100)));
        assert_eq!(stats.average_sell(), None);

        stats.record_sell(dec!(1), dec!(110)).unwrap();
        let perf = stats.performance().unwrap();
        assert_eq!(perf.average_buy, dec!(100));
        assert_eq!(perf.average_sell, dec!(110));
        assert_eq!(perf.realized_return, dec!(20));
        assert_eq!(stats.fills, 2);
    }

    #[test]
    fn overflowing_fill_leaves_wallet_alone() {
        let mut wallet = Wallet::new(dec!(5), dec!(5));
        assert_eq!(wallet.sell(dec!(10), Decimal::MAX), Err(WalletError::Overflow));
        assert_eq!(wallet.buy(dec!(10), Decimal::MAX), Err(WalletError::Overflow));
        assert_eq!(wallet, Wallet::new(dec!(5), dec!(5)));
        assert_eq!(wallet.mark_to_market(Decimal::MAX), None);
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let mut stats = Stats::new();
        stats.record_sell(dec!(1), Decimal::MAX).unwrap();
        assert_eq!(stats.record_sell(dec!(1), Decimal::MAX), Err(WalletError::Overflow));
        assert_eq!(stats.total_sold, dec!(1));
        assert_eq!(stats.fills, 1);
    }
}
