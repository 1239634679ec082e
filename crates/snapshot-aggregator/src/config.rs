use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Upper bound for either lookback window (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    // Insider analysis
    pub insider_window_days: i64,  // 90
    pub cluster_window_days: i64,  // 60
    pub cluster_min_filers: usize, // 3

    // Dilution plausibility bounds
    pub dilution_min: f64, // -0.5
    pub dilution_max: f64, // 5.0

    // Shares-outstanding history lookups
    pub quarterly_range: String, // "2y"
    pub annual_range: String,    // "5y"
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            insider_window_days: 90,
            cluster_window_days: 60,
            cluster_min_filers: 3,
            dilution_min: -0.5,
            dilution_max: 5.0,
            quarterly_range: "2y".to_string(),
            annual_range: "5y".to_string(),
        }
    }
}

impl AggregatorConfig {
    /// Load from the environment (and `.env`, if present), falling back to
    /// the defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            insider_window_days: env::var("SNAPSHOT_INSIDER_WINDOW_DAYS")
                .unwrap_or_else(|_| defaults.insider_window_days.to_string())
                .parse()
                .context("SNAPSHOT_INSIDER_WINDOW_DAYS must be an integer")?,
            cluster_window_days: env::var("SNAPSHOT_CLUSTER_WINDOW_DAYS")
                .unwrap_or_else(|_| defaults.cluster_window_days.to_string())
                .parse()
                .context("SNAPSHOT_CLUSTER_WINDOW_DAYS must be an integer")?,
            cluster_min_filers: env::var("SNAPSHOT_CLUSTER_MIN_FILERS")
                .unwrap_or_else(|_| defaults.cluster_min_filers.to_string())
                .parse()
                .context("SNAPSHOT_CLUSTER_MIN_FILERS must be a positive integer")?,
            dilution_min: env::var("SNAPSHOT_DILUTION_MIN")
                .unwrap_or_else(|_| defaults.dilution_min.to_string())
                .parse()
                .context("SNAPSHOT_DILUTION_MIN must be a number")?,
            dilution_max: env::var("SNAPSHOT_DILUTION_MAX")
                .unwrap_or_else(|_| defaults.dilution_max.to_string())
                .parse()
                .context("SNAPSHOT_DILUTION_MAX must be a number")?,
            quarterly_range: env::var("SNAPSHOT_QUARTERLY_RANGE")
                .unwrap_or(defaults.quarterly_range),
            annual_range: env::var("SNAPSHOT_ANNUAL_RANGE")
                .unwrap_or(defaults.annual_range),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.insider_window_days <= 0 || self.cluster_window_days <= 0 {
            bail!("insider and cluster windows must be positive");
        }
        if self.insider_window_days > MAX_WINDOW_DAYS || self.cluster_window_days > MAX_WINDOW_DAYS {
            bail!("insider and cluster windows must not exceed {} days", MAX_WINDOW_DAYS);
        }
        if self.cluster_min_filers == 0 {
            bail!("cluster_min_filers must be at least 1");
        }
        if !(self.dilution_min < self.dilution_max) {
            bail!(
                "dilution bounds inverted: min {} >= max {}",
                self.dilution_min,
                self.dilution_max
            );
        }
        Ok(())
    }
}
