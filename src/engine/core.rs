// 8.0 engine/core.rs: fans one session runner out per market and joins them.

use super::config::EngineConfig;
use super::results::{EngineError, SessionSummary};
use super::runner::SessionRunner;
use crate::events::Reporter;
use crate::feed::TradeFeed;
use crate::types::MarketId;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/** 8.1: engine. owns the market table and one feed per subscribed market */
pub struct PaperEngine {
    config: EngineConfig,
    feeds: Vec<(MarketId, Box<dyn TradeFeed>)>,
}

impl PaperEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            feeds: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a market and its feed. fails fast when the market has no
    /// configuration, so a typo never surfaces mid-stream.
    pub fn add_market<F: TradeFeed + 'static>(
        &mut self,
        market: MarketId,
        feed: F,
    ) -> Result<(), EngineError> {
        if !self.config.markets.contains(&market) {
            return Err(EngineError::MissingMarketConfig(market));
        }
        if self.feeds.iter().any(|(m, _)| *m == market) {
            return Err(EngineError::DuplicateMarket(market));
        }
        self.feeds.push((market, Box::new(feed)));
        Ok(())
    }

    pub fn markets(&self) -> impl Iterator<Item = &MarketId> {
        self.feeds.iter().map(|(m, _)| m)
    }

    /// Run every market to completion. each runner gets its own clone of the
    /// reporter. summaries come back sorted by market.
    pub async fn run<R>(self, reporter: R) -> Result<Vec<SessionSummary>, EngineError>
    where
        R: Reporter + Clone + 'static,
    {
        if self.feeds.is_empty() {
            return Err(EngineError::NoMarkets);
        }

        let mut tasks = JoinSet::new();
        for (market, feed) in self.feeds {
            let config = self
                .config
                .markets
                .get(&market)
                .cloned()
                .ok_or_else(|| EngineError::MissingMarketConfig(market.clone()))?;
            let mut runner = SessionRunner::new(market.clone(), config, feed, reporter.clone());
            tasks.spawn(async move {
                let result = runner.run().await;
                (market, result)
            });
        }
        info!(markets = tasks.len(), "Started paper trading");

        let mut summaries = Vec::new();
        let mut first_error: Option<EngineError> = None;

        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok((_, Ok(summary))) => {
                    summaries.push(summary);
                    continue;
                }
                Ok((market, Err(source))) => EngineError::Feed { market, source },
                Err(e) if e.is_cancelled() => continue,
                Err(e) => EngineError::TaskFailed {
                    reason: e.to_string(),
                },
            };

            if self.config.cancel_on_error {
                error!(error = %err, remaining = tasks.len(), "Cancelling remaining markets");
                tasks.abort_all();
                return Err(err);
            }

            match first_error {
                None => first_error = Some(err),
                Some(_) => warn!(error = %err, "Additional market failure"),
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                summaries.sort_by(|a, b| a.market.cmp(&b.market));
                Ok(summaries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReportCollector;
    use crate::feed::{ReferencePrice, ReplayFeed};
    use crate::market::{MarketConfig, MarketTable};
    use rust_decimal_macros::dec;

    fn feed() -> ReplayFeed {
        ReplayFeed::new(ReferencePrice::new(dec!(105), dec!(95)), vec![])
    }

    #[test]
    fn add_market_requires_config() {
        let mut engine = PaperEngine::new(EngineConfig::default());
        let err = engine.add_market(MarketId::new("XBTIDR"), feed()).unwrap_err();
        assert_eq!(err, EngineError::MissingMarketConfig(MarketId::new("XBTIDR")));
        assert_eq!(err.market(), Some(&MarketId::new("XBTIDR")));
    }

    #[test]
    fn add_market_rejects_duplicates() {
        let mut engine = PaperEngine::new(EngineConfig::default());
        engine.add_market(MarketId::new("XBTUSDC"), feed()).unwrap();
        assert!(matches!(
            engine.add_market(MarketId::new("XBTUSDC"), feed()),
            Err(EngineError::DuplicateMarket(_))
        ));
        assert_eq!(engine.markets().count(), 1);
    }

    #[tokio::test]
    async fn empty_engine_has_nothing_to_run() {
        let engine = PaperEngine::new(EngineConfig::new(MarketTable::new()));
        assert_eq!(
            engine.run(ReportCollector::new()).await.unwrap_err(),
            EngineError::NoMarkets
        );
    }

    #[tokio::test]
    async fn summaries_sorted_by_market() {
        let mut table = MarketTable::new();
        table.insert(MarketId::new("B"), MarketConfig::new(dec!(1), dec!(1), dec!(1), dec!(1)));
        table.insert(MarketId::new("A"), MarketConfig::new(dec!(1), dec!(1), dec!(1), dec!(1)));

        let mut engine = PaperEngine::new(EngineConfig::new(table));
        engine.add_market(MarketId::new("B"), feed()).unwrap();
        engine.add_market(MarketId::new("A"), feed()).unwrap();

        let summaries = engine.run(ReportCollector::new()).await.unwrap();
        let markets: Vec<_> = summaries.iter().map(|s| s.market.as_str()).collect();
        assert_eq!(markets, vec!["A", "B"]);
    }
}
