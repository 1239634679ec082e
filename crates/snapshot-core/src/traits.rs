use async_trait::async_trait;
use serde_json::Value;

use crate::{SeriesInterval, SnapshotError, SummaryModule};

/// Abstract financial data provider.
///
/// Implementations own transport and auth. Every call may block on I/O and
/// no timeout is applied on this side of the trait; callers wrap `pull` in
/// their own deadline. Throttling should surface as
/// [`SnapshotError::RateLimited`] (see [`SnapshotError::from_provider_message`]).
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Multi-module summary. The response maps module names
    /// ([`SummaryModule::as_str`]) to nested payloads; modules may be missing.
    async fn fetch_comprehensive(
        &self,
        symbol: &str,
        modules: &[SummaryModule],
    ) -> Result<Value, SnapshotError>;

    /// Flat quote record.
    async fn fetch_quote(&self, symbol: &str) -> Result<Value, SnapshotError>;

    /// Periodic fundamentals records for one metric, e.g. shares outstanding.
    async fn fetch_time_series(
        &self,
        symbol: &str,
        metric: &str,
        interval: SeriesInterval,
        range: &str,
    ) -> Result<Vec<Value>, SnapshotError>;

    async fn fetch_insider_transactions(&self, symbol: &str) -> Result<Vec<Value>, SnapshotError>;

    async fn verify_symbol_exists(&self, symbol: &str) -> Result<bool, SnapshotError>;
}
