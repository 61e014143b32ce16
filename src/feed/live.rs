//! Live trade feed over the exchange's per-market websocket stream.
//!
//! Protocol:
//! - connect to `{stream_url}/{market}` and send the API credentials as JSON;
//! - the first message is a full order book snapshot, used only for the
//!   seed price (lowest ask, highest bid);
//! - every later message is a sequenced update, possibly carrying trades;
//! - empty messages are server keep-alives.
//!
//! We ping every `ping_interval` so idle markets are not dropped.

use super::{FeedError, ReferencePrice, TradeBatch, TradeFeed};
use crate::types::{MarketId, Trade};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval_at, timeout, Instant, Interval};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

/// Default market stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "wss://ws.luno.com/api/1/stream";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone)]
pub struct LiveFeedConfig {
    pub stream_url: String,
    pub api_key_id: String,
    pub api_key_secret: String,
    /// Applies to the TCP/TLS handshake and to waiting for the snapshot.
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
}

impl LiveFeedConfig {
    pub fn new(api_key_id: impl Into<String>, api_key_secret: impl Into<String>) -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            api_key_id: api_key_id.into(),
            api_key_secret: api_key_secret.into(),
            connect_timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(30),
        }
    }

    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    fn market_url(&self, market: &MarketId) -> String {
        format!("{}/{}", self.stream_url.trim_end_matches('/'), market)
    }
}

// keep the secret out of logs
impl fmt::Debug for LiveFeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveFeedConfig")
            .field("stream_url", &self.stream_url)
            .field("api_key_id", &self.api_key_id)
            .field("api_key_secret", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("ping_interval", &self.ping_interval)
            .finish()
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    api_key_id: &'a str,
    api_key_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct BookEntry {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookSnapshot {
    sequence: String,
    #[serde(default)]
    asks: Vec<BookEntry>,
    #[serde(default)]
    bids: Vec<BookEntry>,
}

#[derive(Debug, Deserialize)]
struct TradeUpdate {
    base: Decimal,
    counter: Decimal,
}

#[derive(Debug, Deserialize)]
struct StreamUpdate {
    sequence: String,
    #[serde(default)]
    trade_updates: Option<Vec<TradeUpdate>>,
}

pub struct LiveFeed {
    market: MarketId,
    config: LiveFeedConfig,
    stream: Option<WsStream>,
    sequence: u64,
    ping: Option<Interval>,
}

impl LiveFeed {
    pub fn new(market: MarketId, config: LiveFeedConfig) -> Self {
        Self {
            market,
            config,
            stream: None,
            sequence: 0,
            ping: None,
        }
    }

    pub fn market(&self) -> &MarketId {
        &self.market
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[async_trait]
impl TradeFeed for LiveFeed {
    async fn connect(&mut self) -> Result<ReferencePrice, FeedError> {
        let url = self.config.market_url(&self.market);
        info!(market = %self.market, %url, "Connecting to trade stream");

        let connect = timeout(self.config.connect_timeout, connect_async(url.as_str()));
        let (mut ws, _) = match connect.await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(FeedError::Connection(e.to_string())),
            Err(_) => return Err(FeedError::Timeout),
        };

        let credentials = serde_json::to_string(&Credentials {
            api_key_id: &self.config.api_key_id,
            api_key_secret: &self.config.api_key_secret,
        })
        .map_err(|e| FeedError::Parse(e.to_string()))?;

        ws.send(Message::Text(credentials))
            .await
            .map_err(|e| FeedError::WebSocket(e.to_string()))?;

        let (sequence, reference) = loop {
            let msg = match timeout(self.config.connect_timeout, ws.next()).await {
                Ok(msg) => msg,
                Err(_) => return Err(FeedError::Timeout),
            };
            match msg {
                Some(Ok(Message::Text(text))) if is_keepalive(&text) => continue,
                Some(Ok(Message::Text(text))) => break parse_snapshot(&text)?,
                Some(Ok(Message::Ping(data))) => {
                    ws.send(Message::Pong(data))
                        .await
                        .map_err(|e| FeedError::WebSocket(e.to_string()))?;
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(FeedError::Closed(format!("closed before snapshot: {:?}", frame)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(FeedError::WebSocket(e.to_string())),
                None => return Err(FeedError::Closed("stream ended before snapshot".to_string())),
            }
        };

        info!(
            market = %self.market,
            sequence,
            ask = %reference.ask,
            bid = %reference.bid,
            "Connection established key={}",
            self.config.api_key_id
        );

        let period = self.config.ping_interval;
        self.ping = Some(interval_at(Instant::now() + period, period));
        self.sequence = sequence;
        self.stream = Some(ws);
        Ok(reference)
    }

    async fn next_batch(&mut self) -> Result<Option<TradeBatch>, FeedError> {
        let Self {
            market,
            stream,
            sequence,
            ping,
            ..
        } = self;
        let (Some(ws), Some(ping)) = (stream.as_mut(), ping.as_mut()) else {
            return Err(FeedError::NotConnected);
        };

        loop {
            tokio::select! {
                msg = ws.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let Some((seq, batch)) = parse_update(&text)? else {
                                trace!(market = %market, "keep-alive");
                                continue;
                            };
                            check_sequence(sequence, seq)?;
                            return Ok(Some(batch));
                        }
                        Some(Ok(Message::Ping(data))) => {
                            ws.send(Message::Pong(data))
                                .await
                                .map_err(|e| FeedError::WebSocket(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(market = %market, ?frame, "Trade stream closed");
                            *stream = None;
                            return Ok(None);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(FeedError::WebSocket(e.to_string())),
                        None => {
                            warn!(market = %market, "Trade stream ended without close frame");
                            let reason = "stream ended without close frame".to_string();
                            return Err(FeedError::Closed(reason));
                        }
                    }
                }
                _ = ping.tick() => {
                    debug!(market = %market, "ping");
                    ws.send(Message::Ping(Vec::new()))
                        .await
                        .map_err(|e| FeedError::WebSocket(e.to_string()))?;
                }
            }
        }
    }
}

fn is_keepalive(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == "\"\""
}

fn parse_sequence(raw: &str) -> Result<u64, FeedError> {
    raw.parse()
        .map_err(|_| FeedError::Parse(format!("bad sequence {:?}", raw)))
}

// best ask is the lowest ask, best bid the highest bid
fn parse_snapshot(text: &str) -> Result<(u64, ReferencePrice), FeedError> {
    let snapshot: BookSnapshot =
        serde_json::from_str(text).map_err(|e| FeedError::Parse(e.to_string()))?;
    let sequence = parse_sequence(&snapshot.sequence)?;

    let ask = snapshot.asks.iter().map(|e| e.price).min();
    let bid = snapshot.bids.iter().map(|e| e.price).max();
    match (ask, bid) {
        (Some(ask), Some(bid)) => Ok((sequence, ReferencePrice::new(ask, bid))),
        _ => Err(FeedError::NoReferencePrice),
    }
}

// None for a keep-alive
fn parse_update(text: &str) -> Result<Option<(u64, TradeBatch)>, FeedError> {
    if is_keepalive(text) {
        return Ok(None);
    }
    let update: StreamUpdate =
        serde_json::from_str(text).map_err(|e| FeedError::Parse(e.to_string()))?;
    let sequence = parse_sequence(&update.sequence)?;
    let trades = update
        .trade_updates
        .unwrap_or_default()
        .into_iter()
        .map(|t| Trade::new(t.base, t.counter))
        .collect();
    Ok(Some((sequence, trades)))
}

fn check_sequence(last: &mut u64, got: u64) -> Result<(), FeedError> {
    let expected = *last + 1;
    if got != expected {
        return Err(FeedError::OutOfSequence { expected, got });
    }
    *last = got;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = LiveFeedConfig::new("key", "secret");
        assert_eq!(config.stream_url, DEFAULT_STREAM_URL);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(
            config.market_url(&MarketId::new("XBTUSDC")),
            "wss://ws.luno.com/api/1/stream/XBTUSDC"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = LiveFeedConfig::new("key", "hunter2");
        let printed = format!("{:?}", config);
        assert!(printed.contains("key"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_parse_snapshot() {
        let msg = concat!(
            r#"{"sequence":"24352","#,
            r#""asks":[{"id":"A1","price":"1235.00","volume":"0.5"},"#,
            r#"{"id":"A2","price":"1234.00","volume":"0.93"}],"#,
            r#""bids":[{"id":"B1","price":"1200.00","volume":"1"},"#,
            r#"{"id":"B2","price":"1201.50","volume":"2"}],"#,
            r#""status":"ACTIVE","timestamp":1528884331021}"#,
        );
        let (sequence, reference) = parse_snapshot(msg).unwrap();

        assert_eq!(sequence, 24352);
        assert_eq!(reference.ask, dec!(1234.00));
        assert_eq!(reference.bid, dec!(1201.50));
    }

    #[test]
    fn test_parse_snapshot_one_sided() {
        let msg = r#"{"sequence":"1","asks":[{"id":"A1","price":"10","volume":"1"}],"bids":[]}"#;
        assert_eq!(parse_snapshot(msg), Err(FeedError::NoReferencePrice));
    }

    #[test]
    fn test_parse_update_with_trades() {
        let msg = concat!(
            r#"{"sequence":"24353","trade_updates":["#,
            r#"{"sequence":1,"base":"0.1","counter":"5.2","#,
            r#""maker_order_id":"M","taker_order_id":"T"},"#,
            r#"{"base":"2","counter":"202"}],"#,
            r#""create_update":null,"delete_update":null,"status_update":null,"#,
            r#""timestamp":1469031991}"#,
        );
        let (sequence, batch) = parse_update(msg).unwrap().unwrap();

        assert_eq!(sequence, 24353);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], Trade::new(dec!(2), dec!(202)));
    }

    #[test]
    fn test_parse_update_without_trades() {
        let msg = concat!(
            r#"{"sequence":"7","trade_updates":null,"#,
            r#""create_update":{"order_id":"X","type":"BID","price":"1","volume":"1"},"#,
            r#""timestamp":1}"#,
        );
        let (sequence, batch) = parse_update(msg).unwrap().unwrap();
        assert_eq!(sequence, 7);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_keepalive() {
        assert_eq!(parse_update("").unwrap(), None);
        assert_eq!(parse_update("\"\"").unwrap(), None);
        assert!(matches!(parse_update("{not json"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_sequence_gap() {
        let mut last = 10;
        assert!(check_sequence(&mut last, 11).is_ok());
        assert_eq!(last, 11);
        assert_eq!(
            check_sequence(&mut last, 13),
            Err(FeedError::OutOfSequence { expected: 12, got: 13 })
        );
        assert_eq!(last, 11);
    }

    #[tokio::test]
    async fn test_next_batch_before_connect() {
        let mut feed = LiveFeed::new(MarketId::new("XBTUSDC"), LiveFeedConfig::new("k", "s"));
        assert!(!feed.is_connected());
        assert_eq!(feed.next_batch().await, Err(FeedError::NotConnected));
    }
}
