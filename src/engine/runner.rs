//! Session runner: drives one market session over its feed until the feed ends.
//!
//! Connecting -> Streaming -> Closed | Failed. no retries here; a host that
//! wants reconnects builds a new runner.

use super::results::SessionSummary;
use crate::events::Reporter;
use crate::feed::{FeedError, TradeFeed};
use crate::market::MarketConfig;
use crate::session::MarketSession;
use crate::types::MarketId;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Connecting,
    Streaming,
    Closed,
    Failed,
}

impl RunnerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerState::Closed | RunnerState::Failed)
    }
}

pub struct SessionRunner<F, R> {
    market: MarketId,
    config: MarketConfig,
    feed: F,
    reporter: R,
    state: RunnerState,
    session: Option<MarketSession>,
}

impl<F: TradeFeed, R: Reporter> SessionRunner<F, R> {
    pub fn new(market: MarketId, config: MarketConfig, feed: F, reporter: R) -> Self {
        Self {
            market,
            config,
            feed,
            reporter,
            state: RunnerState::Connecting,
            session: None,
        }
    }

    pub fn market(&self) -> &MarketId {
        &self.market
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Session state, once connected.
    pub fn session(&self) -> Option<&MarketSession> {
        self.session.as_ref()
    }

    pub async fn run(&mut self) -> Result<SessionSummary, FeedError> {
        match self.stream().await {
            Ok(summary) => {
                self.transition(RunnerState::Closed);
                info!(
                    market = %self.market,
                    batches = summary.batches_processed,
                    fills = summary.stats.fills,
                    "Feed closed"
                );
                Ok(summary)
            }
            Err(e) => {
                self.transition(RunnerState::Failed);
                error!(market = %self.market, error = %e, "Session failed");
                Err(e)
            }
        }
    }

    async fn stream(&mut self) -> Result<SessionSummary, FeedError> {
        let reference = self.feed.connect().await?;
        info!(market = %self.market, ask = %reference.ask, bid = %reference.bid, "Seeded quotes");

        let mut session = MarketSession::new(self.market.clone(), self.config.clone(), reference);
        self.transition(RunnerState::Streaming);

        let result = loop {
            match self.feed.next_batch().await {
                Ok(Some(batch)) => {
                    if let Some(event) = session.apply_batch(&batch) {
                        self.reporter.report(&event);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let summary = SessionSummary {
            market: self.market.clone(),
            batches_processed: session.batches_processed(),
            wallet: *session.wallet(),
            stats: *session.stats(),
            quotes: *session.quotes(),
        };
        self.session = Some(session);
        result.map(|()| summary)
    }

    fn transition(&mut self, next: RunnerState) {
        debug!(market = %self.market, from = ?self.state, to = ?next, "Runner state");
        self.state = next;
    }
}
