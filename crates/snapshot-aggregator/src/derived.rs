use chrono::NaiveDate;
use serde_json::Value;
use snapshot_core::{
    as_float, parse_calendar_date, safe_get, FinancialDataProvider, ReverseSplit, SeriesInterval,
};
use tracing::{debug, warn};

use crate::config::AggregatorConfig;

pub const SHARES_OUTSTANDING_METRIC: &str = "sharesOutstanding";

const QUARTERS_BACK: usize = 4;
const YEARS_BACK: usize = 2;

/// Short interest as a fraction of float.
pub fn pct_float_short(float_shares: Option<i64>, short_interest: Option<i64>) -> Option<f64> {
    let float_shares = float_shares?;
    let short_interest = short_interest?;
    if float_shares <= 0 || short_interest < 0 {
        return None;
    }
    Some(short_interest as f64 / float_shares as f64)
}

/// Months of cash left at the trailing free-cash-flow burn rate.
///
/// Only defined for a company that is actually burning cash: free cash flow
/// must be strictly negative and cash on hand non-negative.
pub fn cash_runway_months(total_cash: Option<i64>, free_cash_flow: Option<i64>) -> Option<f64> {
    let cash = total_cash?;
    let fcf = free_cash_flow?;
    if cash < 0 || fcf >= 0 {
        return None;
    }

    let burn_per_month = -(fcf as f64) / 12.0;
    if burn_per_month <= 0.0 {
        return None;
    }
    Some(cash as f64 / burn_per_month)
}

/// Positive values of a periodic series, oldest first.
///
/// Records are sorted by report date when every record carries one;
/// otherwise provider order is kept.
pub fn series_points(records: &[Value], metric: &str) -> Vec<f64> {
    let mut points: Vec<(Option<NaiveDate>, f64)> = records
        .iter()
        .filter_map(|record| {
            let value = [metric, "reportedValue", "value"]
                .iter()
                .find_map(|key| safe_get(record, key).and_then(as_float))?;
            if value <= 0.0 {
                return None;
            }
            let date = ["asOfDate", "date"]
                .iter()
                .find_map(|key| safe_get(record, key).and_then(parse_calendar_date));
            Some((date, value))
        })
        .collect();

    if points.iter().all(|(date, _)| date.is_some()) {
        points.sort_by_key(|(date, _)| *date);
    }
    points.into_iter().map(|(_, value)| value).collect()
}

/// Relative change between `current` (or the latest point) and the point
/// `periods_back` entries from the end.
pub fn yoy_change_from_series(points: &[f64], current: Option<f64>, periods_back: usize) -> Option<f64> {
    if periods_back == 0 || points.len() < periods_back {
        return None;
    }
    let past = points[points.len() - periods_back];
    let current = current.or_else(|| points.last().copied())?;
    if past <= 0.0 || !current.is_finite() {
        return None;
    }

    let change = (current - past) / past;
    change.is_finite().then_some(change)
}

async fn series_change<P>(
    provider: &P,
    symbol: &str,
    interval: SeriesInterval,
    range: &str,
    current: Option<f64>,
    periods_back: usize,
) -> Option<f64>
where
    P: FinancialDataProvider + ?Sized,
{
    match provider
        .fetch_time_series(symbol, SHARES_OUTSTANDING_METRIC, interval, range)
        .await
    {
        Ok(records) => {
            let points = series_points(&records, SHARES_OUTSTANDING_METRIC);
            let change = yoy_change_from_series(&points, current, periods_back);
            if change.is_none() {
                debug!(
                    "{} shares history for {} too short ({} points)",
                    interval,
                    symbol,
                    points.len()
                );
            }
            change
        }
        Err(e) => {
            warn!("Failed to fetch {} shares history for {}: {:?}", interval, symbol, e);
            None
        }
    }
}

/// Year-over-year change in shares outstanding.
///
/// Tries the quarterly series first and falls back to the annual one only
/// when the quarterly lookup yields nothing. A computed value outside the
/// configured bounds is dropped.
pub async fn dilution_yoy<P>(
    provider: &P,
    symbol: &str,
    current_shares: Option<i64>,
    config: &AggregatorConfig,
) -> Option<f64>
where
    P: FinancialDataProvider + ?Sized,
{
    let current = current_shares.filter(|s| *s > 0).map(|s| s as f64);

    let change = match series_change(
        provider,
        symbol,
        SeriesInterval::Quarterly,
        &config.quarterly_range,
        current,
        QUARTERS_BACK,
    )
    .await
    {
        Some(change) => change,
        None => {
            series_change(
                provider,
                symbol,
                SeriesInterval::Annual,
                &config.annual_range,
                current,
                YEARS_BACK,
            )
            .await?
        }
    };

    if change < config.dilution_min || change > config.dilution_max {
        debug!(
            "Discarding implausible dilution {:.3} for {} (bounds {}..={})",
            change, symbol, config.dilution_min, config.dilution_max
        );
        return None;
    }
    Some(change)
}

/// No provider in use reports split history, so this never finds one.
pub fn detect_last_reverse_split(symbol: &str) -> ReverseSplit {
    debug!("Reverse split detection not available for {}", symbol);
    ReverseSplit::default()
}
