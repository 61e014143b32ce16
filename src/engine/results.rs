// 8.0.2: result types and errors for engine operations.

use crate::feed::FeedError;
use crate::quote::QuotePair;
use crate::types::MarketId;
use crate::wallet::{Stats, Wallet};

/// Final state of one market once its feed closed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub market: MarketId,
    pub batches_processed: u64,
    pub wallet: Wallet,
    pub stats: Stats,
    pub quotes: QuotePair,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Market {0} has no configuration")]
    MissingMarketConfig(MarketId),

    #[error("Market {0} added twice")]
    DuplicateMarket(MarketId),

    #[error("No markets to run")]
    NoMarkets,

    #[error("Market {market} feed failed: {source}")]
    Feed {
        market: MarketId,
        #[source]
        source: FeedError,
    },

    #[error("Session task failed: {reason}")]
    TaskFailed { reason: String },
}

impl EngineError {
    pub fn market(&self) -> Option<&MarketId> {
        match self {
            EngineError::MissingMarketConfig(m)
            | EngineError::DuplicateMarket(m)
            | EngineError::Feed { market: m, .. } => Some(m),
            EngineError::NoMarkets | EngineError::TaskFailed { .. } => None,
        }
    }
}
