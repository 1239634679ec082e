pub mod aggregator;
pub mod config;
pub mod derived;
pub mod extractors;
pub mod flags;
pub mod insider;
pub mod quality;

pub use aggregator::SnapshotAggregator;
pub use config::AggregatorConfig;
pub use flags::{format_currency, generate_flags, FlagInputs, InsiderThresholds};
pub use insider::analyze_transactions;
pub use quality::assess_quality;
