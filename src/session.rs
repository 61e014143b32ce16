//! Per-market paper-trading session.
//!
//! A session owns one market's config, wallet, quotes and running stats.
//! Each trade batch is reduced to its last trade, evaluated against the
//! resting quotes, booked into the wallet and stats, and then the quotes
//! are rebuilt from the new inventory.

use crate::events::{FillReport, SessionEvent};
use crate::feed::ReferencePrice;
use crate::fill::{evaluate, FillOutcome};
use crate::market::MarketConfig;
use crate::quote::{quotes_for, valuation, QuotePair};
use crate::types::{MarketId, Timestamp, Trade};
use crate::wallet::{Stats, Wallet, WalletError};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct MarketSession {
    market: MarketId,
    config: MarketConfig,
    wallet: Wallet,
    quotes: QuotePair,
    stats: Stats,
    batches: u64,
}

impl MarketSession {
    /// Seed a session from the reference price. quotes start with no volume,
    /// so nothing fills until the first re-quote.
    pub fn new(market: MarketId, config: MarketConfig, reference: ReferencePrice) -> Self {
        let wallet = Wallet::from_config(&config);
        Self {
            market,
            config,
            wallet,
            quotes: QuotePair::seed(reference.ask, reference.bid),
            stats: Stats::new(),
            batches: 0,
        }
    }

    pub fn market(&self) -> &MarketId {
        &self.market
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn quotes(&self) -> &QuotePair {
        &self.quotes
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Batches that produced an event.
    pub fn batches_processed(&self) -> u64 {
        self.batches
    }

    /// Process one trade batch. only the last trade counts; earlier trades in
    /// the same batch are dropped on purpose. returns None for an empty batch,
    /// an unpriceable last trade, or a fill too large to book.
    pub fn apply_batch(&mut self, trades: &[Trade]) -> Option<SessionEvent> {
        let last = trades.last()?;

        let Some(outcome) = evaluate(&self.quotes, last) else {
            warn!(
                market = %self.market,
                base = %last.base,
                counter = %last.counter,
                "skipping unpriceable trade"
            );
            return None;
        };

        if let Err(e) = self.book(&outcome) {
            warn!(
                market = %self.market,
                volume = %outcome.volume(),
                price = ?outcome.fill_price(),
                error = %e,
                "skipping batch, fill does not fit the wallet"
            );
            return None;
        }
        let last_price = outcome.last_price();

        let requoted = valuation(&self.wallet, last_price)
            .and_then(|v| Ok((v, quotes_for(last_price, &v, &self.config)?)));
        let (valuation, degenerate) = match requoted {
            Ok((v, quotes)) => {
                self.quotes = quotes;
                (Some(v), false)
            }
            Err(e) => {
                warn!(
                    market = %self.market,
                    %last_price,
                    error = %e,
                    "cannot value wallet, idling quotes"
                );
                self.quotes = QuotePair::idle(last_price);
                (None, true)
            }
        };
        self.batches += 1;

        let fill = outcome
            .side()
            .zip(outcome.fill_price())
            .map(|(side, price)| FillReport {
                side,
                volume: outcome.volume(),
                price,
            });

        Some(SessionEvent {
            market: self.market.clone(),
            timestamp: Timestamp::now(),
            fill,
            last_price,
            wallet: self.wallet,
            stats: self.stats,
            performance: self.stats.performance(),
            total_value: valuation
                .map(|v| v.total_value)
                .or_else(|| self.wallet.mark_to_market(last_price)),
            base_ratio: valuation.map(|v| v.base_ratio),
            counter_ratio: valuation.map(|v| v.counter_ratio),
            quotes: self.quotes,
            spread_pct: self.quotes.spread_pct(last_price),
            degenerate,
        })
    }

    // zero-volume fills are no-ops: they must not bump the fill count or touch totals.
    // wallet and stats change together or not at all.
    fn book(&mut self, outcome: &FillOutcome) -> Result<(), WalletError> {
        if outcome.is_empty() {
            if outcome.side().is_some() {
                debug!(market = %self.market, ?outcome, "empty fill against zero-volume quote");
            }
            return Ok(());
        }

        let mut wallet = self.wallet;
        let mut stats = self.stats;
        match *outcome {
            FillOutcome::Sold { volume, price, .. } => {
                let value = wallet.sell(volume, price)?;
                stats.record_sell(volume, value)?;
            }
            FillOutcome::Bought { volume, price, .. } => {
                let value = wallet.buy(volume, price)?;
                stats.record_buy(volume, value)?;
            }
            FillOutcome::NoFill { .. } => {}
        }
        self.wallet = wallet;
        self.stats = stats;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn session() -> MarketSession {
        MarketSession::new(
            MarketId::new("XBTUSDC"),
            MarketConfig::new(dec!(1), dec!(10), dec!(5), dec!(5)),
            ReferencePrice::new(dec!(105), dec!(95)),
        )
    }

    #[test]
    fn empty_batch_is_skipped() {
        let mut s = session();
        assert!(s.apply_batch(&[]).is_none());
        assert_eq!(s.batches_processed(), 0);
        assert_eq!(s.quotes(), &QuotePair::seed(dec!(105), dec!(95)));
    }

    #[test]
    fn only_last_trade_counts() {
        let mut s = session();
        // first trade would cross the seed ask, last one prints inside
        let batch = [Trade::new(dec!(1), dec!(200)), Trade::new(dec!(2), dec!(202))];
        let event = s.apply_batch(&batch).unwrap();

        assert!(event.fill.is_none());
        assert_eq!(event.last_price, dec!(101));
        assert_eq!(s.wallet(), &Wallet::new(dec!(5), dec!(5)));
    }

    #[test]
    fn no_fill_still_requotes() {
        let mut s = session();
        let event = s.apply_batch(&[Trade::new(dec!(2), dec!(202))]).unwrap();

        assert_eq!(s.stats(), &Stats::new());
        assert_eq!(s.quotes().ask.price, dec!(101.009803922));
        assert_eq!(s.quotes().bid.price, dec!(100.009803922));
        assert_eq!(event.total_value, Some(dec!(510)));
        assert_eq!(event.base_ratio, Some(dec!(0.990196078)));
        assert!(!event.degenerate);
    }

    #[test]
    fn startup_cross_is_an_empty_fill() {
        let mut s = session();
        let event = s.apply_batch(&[Trade::new(dec!(1), dec!(120))]).unwrap();

        let fill = event.fill.unwrap();
        assert_eq!(fill.side, Side::Sell);
        assert_eq!(fill.volume, Decimal::ZERO);
        assert_eq!(s.wallet(), &Wallet::new(dec!(5), dec!(5)));
        assert_eq!(s.stats().fills, 0);
    }

    #[test]
    fn bought_below_bid_adds_base() {
        let mut s = session();
        s.apply_batch(&[Trade::new(dec!(2), dec!(202))]).unwrap();
        let bid = s.quotes().bid;

        let event = s.apply_batch(&[Trade::new(dec!(1), dec!(100))]).unwrap();

        assert!(event.bought());
        assert_eq!(s.wallet().base, dec!(5) + bid.volume);
        assert_eq!(s.wallet().counter, dec!(5) - bid.volume * dec!(100));
        assert_eq!(s.stats().total_bought, bid.volume);
        assert_eq!(s.stats().total_spent, bid.volume * dec!(100));
    }

    #[test]
    fn sold_above_ask_moves_inventory() {
        let mut s = session();
        s.apply_batch(&[Trade::new(dec!(2), dec!(202))]).unwrap();
        let ask = s.quotes().ask;

        // 3 base at 102 each: capped by the trade size
        let event = s.apply_batch(&[Trade::new(dec!(3), dec!(306))]).unwrap();

        let fill = event.fill.unwrap();
        assert_eq!(fill.volume, dec!(3));
        assert_eq!(fill.price, ask.price);
        assert_eq!(s.wallet().base, dec!(2));
        assert_eq!(s.wallet().counter, dec!(5) + dec!(3) * ask.price);
        assert_eq!(s.stats().total_earned, dec!(3) * ask.price);
    }

    #[test]
    fn zero_value_wallet_idles() {
        let mut s = MarketSession::new(
            MarketId::new("XBTUSDC"),
            MarketConfig::new(dec!(1), dec!(10), Decimal::ZERO, Decimal::ZERO),
            ReferencePrice::new(dec!(105), dec!(95)),
        );
        let event = s.apply_batch(&[Trade::new(dec!(1), dec!(100))]).unwrap();

        assert!(event.degenerate);
        assert_eq!(event.total_value, Some(Decimal::ZERO));
        assert_eq!(event.base_ratio, None);
        assert_eq!(s.quotes(), &QuotePair::idle(dec!(100)));

        // next tick crosses the idle ask but has nothing to fill
        let event = s.apply_batch(&[Trade::new(dec!(1), dec!(100))]).unwrap();
        assert!(event.sold());
        assert_eq!(s.stats(), &Stats::new());
    }

    #[test]
    fn unpriceable_last_trade_skipped() {
        let mut s = session();
        assert!(s.apply_batch(&[Trade::new(Decimal::ZERO, dec!(1))]).is_none());
        assert_eq!(s.batches_processed(), 0);
    }

    #[test]
    fn unvaluable_price_idles_instead_of_panicking() {
        let mut s = MarketSession::new(
            MarketId::new("ETHXBT"),
            MarketConfig::eth_xbt(),
            ReferencePrice::new(dec!(0.05), dec!(0.04)),
        );
        // 7.9e27 per base: 15 base no longer fits in a Decimal
        let batch = [Trade::new(dec!(0.00000001), dec!(79000000000000000000))];
        let event = s.apply_batch(&batch).unwrap();

        assert_eq!(event.last_price, dec!(7900000000000000000000000000));
        assert!(event.degenerate);
        assert_eq!(event.total_value, None);
        assert_eq!(event.base_ratio, None);
        assert_eq!(s.quotes(), &QuotePair::idle(event.last_price));
        assert_eq!(s.wallet(), &Wallet::new(dec!(15), dec!(1)));
        assert_eq!(s.batches_processed(), 1);
    }

    #[test]
    fn overflowing_fill_skips_batch() {
        let price = Decimal::from_i128_with_scale(10i128.pow(28), 0);
        let counter = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        let mut s = MarketSession::new(
            MarketId::new("XBTUSDC"),
            MarketConfig::new(Decimal::ZERO, dec!(100), dec!(1), counter),
            ReferencePrice::new(price * dec!(2), dec!(1)),
        );
        let event = s.apply_batch(&[Trade::new(dec!(1), price)]).unwrap();
        assert!(!event.degenerate);
        let quotes = *s.quotes();

        // selling 7 at 1e28 pushes the counter leg past Decimal::MAX
        assert!(s.apply_batch(&[Trade::new(dec!(7), price * dec!(7))]).is_none());
        assert_eq!(s.wallet(), &Wallet::new(dec!(1), counter));
        assert_eq!(s.stats(), &Stats::new());
        assert_eq!(s.quotes(), &quotes);
        assert_eq!(s.batches_processed(), 1);
    }
}
