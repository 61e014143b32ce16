// 6.2: every processed batch produces one SessionEvent. the engine hands it to a
// Reporter with plain values and never reads anything back.

use crate::quote::QuotePair;
use crate::types::{MarketId, Side, Timestamp};
use crate::wallet::{Performance, Stats, Wallet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReport {
    pub side: Side,
    pub volume: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub market: MarketId,
    pub timestamp: Timestamp,
    /// None when the last trade printed between our quotes
    pub fill: Option<FillReport>,
    pub last_price: Decimal,
    pub wallet: Wallet,
    pub stats: Stats,
    pub performance: Option<Performance>,
    /// None when the wallet cannot be marked at this price without overflow
    pub total_value: Option<Decimal>,
    pub base_ratio: Option<Decimal>,
    pub counter_ratio: Option<Decimal>,
    pub quotes: QuotePair,
    pub spread_pct: Option<Decimal>,
    /// The wallet could not be valued (zero or overflowing) and idle quotes
    /// were substituted
    pub degenerate: bool,
}

impl SessionEvent {
    pub fn sold(&self) -> bool {
        matches!(self.fill, Some(FillReport { side: Side::Sell, .. }))
    }

    pub fn bought(&self) -> bool {
        matches!(self.fill, Some(FillReport { side: Side::Buy, .. }))
    }
}

pub trait Reporter: Send {
    fn report(&mut self, event: &SessionEvent);
}

/// Renders events as log lines through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: &SessionEvent) {
        let market = &event.market;

        match event.fill {
            Some(fill) => info!("{}: {} {}@{}", market, fill.side, fill.volume, fill.price),
            None => info!("{}: last_price={}", market, event.last_price),
        }

        if let Some(perf) = event.performance {
            info!(
                "{}: avg_buy_value={} avg_sell_value={} avg_buy_return={}",
                market, perf.average_buy, perf.average_sell, perf.realized_return
            );
        }

        let ratios = event.base_ratio.zip(event.counter_ratio);
        if event.degenerate {
            let value = event
                .total_value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            warn!(
                "{}: current_value={}, quoting nothing until the wallet can be valued",
                market, value
            );
        } else if let (Some(total), Some((base_ratio, counter_ratio))) =
            (event.total_value, ratios)
        {
            info!(
                "{}: current_value={} base_ratio={} counter_ratio={}",
                market,
                total.round_dp(6),
                base_ratio.round_dp(3),
                counter_ratio.round_dp(3)
            );
        }

        let spread = event
            .spread_pct
            .map(|s| s.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            "{}: ask_price={} bid_price={} spread={}%",
            market, event.quotes.ask.price, event.quotes.bid.price, spread
        );
    }
}

/// Keeps every event in memory. clones share the same buffer, so one
/// collector can be handed to several runners. a poisoned buffer is still
/// read and written; events are plain values.
#[derive(Debug, Clone, Default)]
pub struct ReportCollector {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn events_for(&self, market: &MarketId) -> Vec<SessionEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.market == market)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Reporter for ReportCollector {
    fn report(&mut self, event: &SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report(&mut self, event: &SessionEvent) {
        (**self).report(event);
    }
}
