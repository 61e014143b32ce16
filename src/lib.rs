// paper-maker: paper-trading market maker.
// quotes an inventory-skewed ask/bid around the last traded price and books
// synthetic fills against a public trade feed. no orders ever reach a venue.
// all pricing math is pure Decimal; I/O lives in feed/ and the binary.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, Side, Trade, Timestamp, scaled division
//   2.x  market.rs: per-market config, presets, MarketTable
//   3.x  wallet.rs: simulated balances and trade statistics
//   4.x  quote.rs: inventory valuation and the re-quoter
//   5.x  fill.rs: fill evaluator (trade vs resting quotes)
//   6.x  session.rs: market session, one batch at a time
//   6.2  events.rs: session events and reporters
//   7.x  config.rs: app config, env overrides, secrets
//   8.x  engine/: session runner and multi-market orchestration
//   9.x  feed/: trade feeds (live websocket, recorded replay)

// pricing core
pub mod fill;
pub mod market;
pub mod quote;
pub mod session;
pub mod types;
pub mod wallet;

// orchestration
pub mod engine;
pub mod events;

// integration modules
pub mod config;
pub mod feed;

// re exports for convenience
pub use config::{AppConfig, ConfigError};
pub use engine::{
    EngineConfig, EngineError, PaperEngine, RunnerState, SessionRunner, SessionSummary,
};
pub use events::{FillReport, ReportCollector, Reporter, SessionEvent, TracingReporter};
pub use feed::{
    FeedError, LiveFeed, LiveFeedConfig, ReferencePrice, ReplayFeed, ReplayFile, TradeBatch,
    TradeFeed,
};
pub use fill::{evaluate, FillOutcome};
pub use market::{MarketConfig, MarketError, MarketTable};
pub use quote::{quotes_for, requote, valuation, Quote, QuotePair, RequoteError, Valuation};
pub use session::MarketSession;
pub use types::{MarketId, Side, Timestamp, Trade};
pub use wallet::{Performance, Stats, Wallet, WalletError};
