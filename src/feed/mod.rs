// 9.0: trade feed abstraction. the session runner only needs a seed price and then
// "next batch of trades, in order" until the feed ends. where they come from
// (exchange websocket, a recorded file, a test vector) is up to the implementor.

pub mod live;
pub mod replay;

pub use live::{LiveFeed, LiveFeedConfig};
pub use replay::{ReplayFeed, ReplayFile};

use crate::types::Trade;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One-time best ask/bid used to seed quotes before any trade arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub ask: Decimal,
    pub bid: Decimal,
}

impl ReferencePrice {
    pub fn new(ask: Decimal, bid: Decimal) -> Self {
        Self { ask, bid }
    }
}

pub type TradeBatch = Vec<Trade>;

#[async_trait]
pub trait TradeFeed: Send {
    /// Establish the feed and return the seed price.
    async fn connect(&mut self) -> Result<ReferencePrice, FeedError>;

    /// Next batch in arrival order. Ok(None) once the feed has ended cleanly.
    async fn next_batch(&mut self) -> Result<Option<TradeBatch>, FeedError>;
}

#[async_trait]
impl<F: TradeFeed + ?Sized> TradeFeed for Box<F> {
    async fn connect(&mut self) -> Result<ReferencePrice, FeedError> {
        (**self).connect().await
    }

    async fn next_batch(&mut self) -> Result<Option<TradeBatch>, FeedError> {
        (**self).next_batch().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timed out connecting")]
    Timeout,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Sequence gap: expected {expected}, got {got}")]
    OutOfSequence { expected: u64, got: u64 },

    #[error("Order book snapshot has no best ask or bid")]
    NoReferencePrice,

    #[error("Feed closed abnormally: {0}")]
    Closed(String),

    #[error("Feed used before connect")]
    NotConnected,
}
