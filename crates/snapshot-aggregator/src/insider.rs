//! Insider transaction aggregation.
//!
//! Transactions arrive as loosely-shaped provider records. Direction, value
//! and filer role are all inferred from whatever keys are present, using the
//! rule tables below.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde_json::Value;
use snapshot_core::{as_float, as_text, parse_calendar_date, safe_get, FinancialDataProvider, InsiderAggregate};
use tracing::{debug, warn};

use crate::config::AggregatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

const DATE_KEYS: &[&str] = &["startDate", "transactionDate", "date", "filingDate"];
const CODE_KEYS: &[&str] = &["transactionCode", "code"];
const TEXT_KEYS: &[&str] = &["transactionText", "transactionType", "text"];
const VALUE_KEYS: &[&str] = &["value", "totalValue", "total_value"];
const SHARES_KEYS: &[&str] = &["shares", "sharesTraded"];
const FILER_KEYS: &[&str] = &["filerName", "name"];
const ROLE_KEYS: &[&str] = &["filerRelation", "title", "relation"];

const BUY_CODES: &[&str] = &["P", "B", "BUY"];
const SELL_CODES: &[&str] = &["S", "SELL"];
const BUY_KEYWORDS: &[&str] = &["purchase", "buy", "bought"];
const SELL_KEYWORDS: &[&str] = &["sale", "sell", "sold"];

/// First matching row wins; anything unmatched weighs 1.0.
const ROLE_WEIGHTS: &[(&[&str], f64)] = &[
    (&["ceo", "cfo", "chief executive", "chief financial"], 2.0),
    (&["officer", "director", "president", "vp", "vice president"], 1.5),
];

#[derive(Debug, Clone, Copy)]
enum PriceShape {
    /// Two captures; the midpoint is used.
    Range,
    Single,
}

const NUM: &str = r"([0-9][0-9,]*(?:\.[0-9]+)?)";

static PRICE_PATTERNS: LazyLock<Vec<(Regex, PriceShape)>> = LazyLock::new(|| {
    [
        (format!(r"(?i)price\s+(?:of\s+)?\$?\s*{NUM}\s*(?:-|to)\s*\$?\s*{NUM}"), PriceShape::Range),
        (format!(r"\$\s*{NUM}\s*(?:-|to)\s*\$\s*{NUM}"), PriceShape::Range),
        (format!(r"(?i)price\s+(?:of\s+)?\$?\s*{NUM}"), PriceShape::Single),
        (format!(r"(?i)\$\s*{NUM}\s*per\s+share"), PriceShape::Single),
        (format!(r"(?i)\bat\s+\$\s*{NUM}"), PriceShape::Single),
    ]
    .into_iter()
    .filter_map(|(pattern, shape)| Regex::new(&pattern).ok().map(|re| (re, shape)))
    .collect()
});

fn first_float(tx: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| safe_get(tx, key).and_then(as_float))
}

fn first_text(tx: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| safe_get(tx, key).and_then(as_text))
}

fn transaction_date(tx: &Value) -> Option<NaiveDate> {
    DATE_KEYS
        .iter()
        .find_map(|key| safe_get(tx, key).and_then(parse_calendar_date))
}

fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Buy or sell, from an explicit transaction code or, failing that, keywords
/// in the free-text description. Ambiguous text yields `None`.
pub fn classify_direction(tx: &Value) -> Option<Direction> {
    if let Some(code) = first_text(tx, CODE_KEYS) {
        let code = code.to_uppercase();
        if BUY_CODES.contains(&code.as_str()) {
            return Some(Direction::Buy);
        }
        if SELL_CODES.contains(&code.as_str()) {
            return Some(Direction::Sell);
        }
    }

    let text = first_text(tx, TEXT_KEYS)?.to_lowercase();
    let is_buy = BUY_KEYWORDS.iter().any(|kw| text.contains(kw));
    let is_sell = SELL_KEYWORDS.iter().any(|kw| text.contains(kw));
    match (is_buy, is_sell) {
        (true, false) => Some(Direction::Buy),
        (false, true) => Some(Direction::Sell),
        _ => None,
    }
}

/// Per-share price mentioned in transaction text, e.g.
/// "Sale at price 101.68 - 104.28 per share."
pub fn price_from_text(text: &str) -> Option<f64> {
    PRICE_PATTERNS.iter().find_map(|(re, shape)| {
        let caps = re.captures(text)?;
        let price = match shape {
            PriceShape::Range => {
                let low = parse_number(caps.get(1)?.as_str())?;
                let high = parse_number(caps.get(2)?.as_str())?;
                (low + high) / 2.0
            }
            PriceShape::Single => parse_number(caps.get(1)?.as_str())?,
        };
        (price > 0.0).then_some(price)
    })
}

/// Currency value of a transaction.
///
/// Falls back from an explicit value to text price × shares, then current
/// price × shares, and finally the bare share count. That last step mixes
/// units and overstates or understates the value; it is kept so that a
/// filing without any price still counts toward direction and activity.
pub fn transaction_value(tx: &Value, current_price: Option<f64>) -> Option<f64> {
    let explicit = first_float(tx, VALUE_KEYS).filter(|v| *v > 0.0);
    let shares = first_float(tx, SHARES_KEYS).map(f64::abs).filter(|s| *s > 0.0);

    let value = explicit
        .or_else(|| {
            let price = first_text(tx, TEXT_KEYS).and_then(|text| price_from_text(&text))?;
            Some(shares? * price)
        })
        .or_else(|| Some(shares? * current_price.filter(|p| *p > 0.0)?))
        .or(shares)?;

    (value.is_finite() && value > 0.0).then_some(value)
}

/// Seniority multiplier for a filer's role, matched case-insensitively.
pub fn role_weight(role: &str) -> f64 {
    let role = role.to_lowercase();
    ROLE_WEIGHTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| role.contains(n)))
        .map(|(_, weight)| *weight)
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyEvent {
    pub date: NaiveDate,
    pub filer: Option<String>,
}

/// Several distinct insiders buying within a short span.
pub fn detect_cluster(buys: &[BuyEvent], config: &AggregatorConfig) -> bool {
    if buys.len() < config.cluster_min_filers {
        return false;
    }

    let filers: HashSet<String> = buys
        .iter()
        .filter_map(|b| b.filer.as_deref())
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    if filers.len() < config.cluster_min_filers {
        return false;
    }

    let first = buys.iter().map(|b| b.date).min();
    let last = buys.iter().map(|b| b.date).max();
    match (first, last) {
        (Some(first), Some(last)) => (last - first).num_days() <= config.cluster_window_days,
        _ => false,
    }
}

/// Price estimate used to value transactions that carry only a share count.
pub fn price_estimate(market_cap: Option<i64>, shares_outstanding: Option<i64>) -> Option<f64> {
    match (market_cap, shares_outstanding) {
        (Some(cap), Some(shares)) if cap > 0 && shares > 0 => Some(cap as f64 / shares as f64),
        _ => None,
    }
}

/// Start of a lookback window, clamped to the earliest representable date.
fn days_before(today: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

/// Aggregate the transactions dated within the lookback window ending at
/// `today`. Returns `None` when nothing qualifies.
pub fn analyze_transactions(
    transactions: &[Value],
    current_price: Option<f64>,
    today: NaiveDate,
    config: &AggregatorConfig,
) -> Option<InsiderAggregate> {
    let window_start = days_before(today, config.insider_window_days);
    let cluster_start = days_before(today, config.cluster_window_days);

    let mut net_buying = 0.0;
    let mut executive_buying = 0.0;
    let mut transaction_count = 0u32;
    let mut recent_buys = Vec::new();

    for tx in transactions {
        let Some(date) = transaction_date(tx) else { continue };
        if date < window_start || date > today {
            continue;
        }
        let Some(direction) = classify_direction(tx) else { continue };
        let Some(value) = transaction_value(tx, current_price) else { continue };

        let weight = first_text(tx, ROLE_KEYS).map_or(1.0, |role| role_weight(&role));
        let signed = match direction {
            Direction::Buy => value,
            Direction::Sell => -value,
        };

        net_buying += signed;
        executive_buying += signed * weight;
        transaction_count += 1;

        if direction == Direction::Buy && date >= cluster_start {
            recent_buys.push(BuyEvent {
                date,
                filer: first_text(tx, FILER_KEYS),
            });
        }
    }

    if transaction_count == 0 {
        return None;
    }
    if !net_buying.is_finite() || !executive_buying.is_finite() {
        warn!("Insider totals overflowed across {} transactions; dropping aggregate", transaction_count);
        return None;
    }

    Some(InsiderAggregate {
        net_buying,
        transaction_count,
        executive_buying,
        cluster_detected: detect_cluster(&recent_buys, config),
    })
}

pub async fn fetch_insider_aggregate<P>(
    provider: &P,
    symbol: &str,
    current_price: Option<f64>,
    today: NaiveDate,
    config: &AggregatorConfig,
) -> Option<InsiderAggregate>
where
    P: FinancialDataProvider + ?Sized,
{
    match provider.fetch_insider_transactions(symbol).await {
        Ok(transactions) if transactions.is_empty() => {
            debug!("No insider transactions reported for {}", symbol);
            None
        }
        Ok(transactions) => analyze_transactions(&transactions, current_price, today, config),
        Err(e) => {
            warn!("Failed to fetch insider transactions for {}: {:?}", symbol, e);
            None
        }
    }
}
