//! Engine configuration options.

use crate::market::MarketTable;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tuning for every market the engine may run.
    pub markets: MarketTable,
    /// Abort the remaining runners as soon as one fails. Off by default:
    /// every runner finishes and the first error is reported afterwards.
    pub cancel_on_error: bool,
}

impl EngineConfig {
    pub fn new(markets: MarketTable) -> Self {
        Self {
            markets,
            cancel_on_error: false,
        }
    }

    pub fn with_cancel_on_error(mut self, cancel: bool) -> Self {
        self.cancel_on_error = cancel;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(MarketTable::defaults())
    }
}
