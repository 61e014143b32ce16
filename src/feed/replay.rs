//! Replay feed: pre-recorded trade batches, in memory or from a JSON file.
//!
//! File layout:
//!
//! ```json
//! {"market": "XBTUSDC", "ask": "105", "bid": "95",
//!  "batches": [[{"base": "2", "counter": "202"}]]}
//! ```

use super::{FeedError, ReferencePrice, TradeBatch, TradeFeed};
use crate::types::{MarketId, Trade};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFile {
    pub market: MarketId,
    pub ask: Decimal,
    pub bid: Decimal,
    #[serde(default)]
    pub batches: Vec<Vec<Trade>>,
}

impl ReplayFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, FeedError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            FeedError::Connection(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, FeedError> {
        serde_json::from_str(content).map_err(|e| FeedError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ReplayFeed {
    reference: ReferencePrice,
    batches: VecDeque<TradeBatch>,
    connect_error: Option<FeedError>,
    // returned once the batches run out, instead of a clean end
    trailing_error: Option<FeedError>,
    connected: bool,
}

impl ReplayFeed {
    pub fn new(reference: ReferencePrice, batches: Vec<TradeBatch>) -> Self {
        Self {
            reference,
            batches: batches.into(),
            connect_error: None,
            trailing_error: None,
            connected: false,
        }
    }

    pub fn from_file(file: ReplayFile) -> Self {
        Self::new(ReferencePrice::new(file.ask, file.bid), file.batches)
    }

    /// End with an error after the last batch.
    pub fn failing_with(mut self, error: FeedError) -> Self {
        self.trailing_error = Some(error);
        self
    }

    /// Refuse to connect.
    pub fn unreachable(mut self, error: FeedError) -> Self {
        self.connect_error = Some(error);
        self
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

#[async_trait]
impl TradeFeed for ReplayFeed {
    async fn connect(&mut self) -> Result<ReferencePrice, FeedError> {
        if let Some(e) = self.connect_error.take() {
            return Err(e);
        }
        self.connected = true;
        Ok(self.reference)
    }

    async fn next_batch(&mut self) -> Result<Option<TradeBatch>, FeedError> {
        if !self.connected {
            return Err(FeedError::NotConnected);
        }
        match self.batches.pop_front() {
            Some(batch) => Ok(Some(batch)),
            None => match self.trailing_error.take() {
                Some(e) => Err(e),
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn replays_in_order_then_ends() {
        let mut feed = ReplayFeed::new(
            ReferencePrice::new(dec!(105), dec!(95)),
            vec![
                vec![Trade::new(dec!(1), dec!(100))],
                vec![],
                vec![Trade::new(dec!(2), dec!(202))],
            ],
        );

        assert_eq!(feed.next_batch().await, Err(FeedError::NotConnected));
        assert_eq!(feed.connect().await.unwrap(), ReferencePrice::new(dec!(105), dec!(95)));

        assert_eq!(feed.next_batch().await.unwrap().unwrap().len(), 1);
        assert!(feed.next_batch().await.unwrap().unwrap().is_empty());
        assert_eq!(feed.remaining(), 1);
        assert_eq!(
            feed.next_batch().await.unwrap().unwrap()[0],
            Trade::new(dec!(2), dec!(202))
        );
        assert_eq!(feed.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn trailing_error_after_batches() {
        let mut feed = ReplayFeed::new(ReferencePrice::new(dec!(2), dec!(1)), vec![vec![]])
            .failing_with(FeedError::Closed("reset".to_string()));
        feed.connect().await.unwrap();

        assert!(feed.next_batch().await.unwrap().is_some());
        assert_eq!(
            feed.next_batch().await,
            Err(FeedError::Closed("reset".to_string()))
        );
    }

    #[tokio::test]
    async fn unreachable_feed() {
        let mut feed = ReplayFeed::new(ReferencePrice::new(dec!(2), dec!(1)), vec![])
            .unreachable(FeedError::Timeout);
        assert_eq!(feed.connect().await, Err(FeedError::Timeout));
    }

    #[test]
    fn parse_replay_file() {
        let json = r#"{"market": "XBTUSDC", "ask": "105", "bid": "95",
            "batches": [[{"base": "2", "counter": "202"}], []]}"#;
        let file = ReplayFile::from_json_str(json).unwrap();

        assert_eq!(file.market, MarketId::new("XBTUSDC"));
        assert_eq!(file.ask, dec!(105));
        assert_eq!(file.batches.len(), 2);
        assert_eq!(file.batches[0][0].counter, dec!(202));
    }

    #[test]
    fn bad_replay_file() {
        assert!(matches!(
            ReplayFile::from_json_str("{\"market\": 1}"),
            Err(FeedError::Parse(_))
        ));
    }
}
