//! Provider-shape to canonical-field mappings.
//!
//! Each extractor is pure and total: it accepts any JSON value (including an
//! empty object or something that isn't a mapping at all) and returns only
//! the fields it could read. Within one extractor the first key listed for a
//! field wins.

use serde_json::Value;
use snapshot_core::{
    as_float, as_int, as_text, get_path, parse_calendar_date, safe_get, Field, PartialRecord,
    SummaryModule,
};

/// Single-sentence descriptions longer than this are truncated.
pub const DESCRIPTION_MAX_CHARS: usize = 220;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Int,
    Float,
    Text,
    Date,
}

struct Mapping {
    path: &'static [&'static str],
    field: Field,
    kind: Kind,
}

const fn m(path: &'static [&'static str], field: Field, kind: Kind) -> Mapping {
    Mapping { path, field, kind }
}

const QUOTE_FIELDS: &[Mapping] = &[
    m(&["regularMarketPrice"], Field::RegularMarketPrice, Kind::Float),
    m(&["regularMarketPreviousClose"], Field::PreviousClose, Kind::Float),
    m(&["regularMarketDayHigh"], Field::DayHigh, Kind::Float),
    m(&["regularMarketDayLow"], Field::DayLow, Kind::Float),
    m(&["fiftyTwoWeekHigh"], Field::FiftyTwoWeekHigh, Kind::Float),
    m(&["fiftyTwoWeekLow"], Field::FiftyTwoWeekLow, Kind::Float),
    m(&["regularMarketVolume"], Field::Volume, Kind::Int),
    m(&["averageDailyVolume3Month"], Field::AverageVolume, Kind::Int),
    m(&["averageDailyVolume10Day"], Field::AverageVolume, Kind::Int),
    m(&["marketCap"], Field::MarketCap, Kind::Int),
    m(&["sharesOutstanding"], Field::SharesOutstanding, Kind::Int),
    m(&["currency"], Field::Currency, Kind::Text),
    m(&["fullExchangeName"], Field::Exchange, Kind::Text),
    m(&["exchange"], Field::Exchange, Kind::Text),
    m(&["longName"], Field::CompanyName, Kind::Text),
    m(&["shortName"], Field::CompanyName, Kind::Text),
    m(&["ipoExpectedDate"], Field::IpoDate, Kind::Date),
];

const PRICE_FIELDS: &[Mapping] = &[
    m(&["regularMarketPrice"], Field::RegularMarketPrice, Kind::Float),
    m(&["regularMarketPreviousClose"], Field::PreviousClose, Kind::Float),
    m(&["regularMarketDayHigh"], Field::DayHigh, Kind::Float),
    m(&["regularMarketDayLow"], Field::DayLow, Kind::Float),
    m(&["regularMarketVolume"], Field::Volume, Kind::Int),
    m(&["marketCap"], Field::MarketCap, Kind::Int),
    m(&["currency"], Field::Currency, Kind::Text),
    m(&["exchangeName"], Field::Exchange, Kind::Text),
    m(&["longName"], Field::CompanyName, Kind::Text),
    m(&["shortName"], Field::CompanyName, Kind::Text),
];

const QUOTE_TYPE_FIELDS: &[Mapping] = &[
    m(&["longName"], Field::CompanyName, Kind::Text),
    m(&["shortName"], Field::CompanyName, Kind::Text),
    m(&["exchange"], Field::Exchange, Kind::Text),
];

const SUMMARY_DETAIL_FIELDS: &[Mapping] = &[
    m(&["previousClose"], Field::PreviousClose, Kind::Float),
    m(&["regularMarketPreviousClose"], Field::PreviousClose, Kind::Float),
    m(&["dayHigh"], Field::DayHigh, Kind::Float),
    m(&["dayLow"], Field::DayLow, Kind::Float),
    m(&["fiftyTwoWeekHigh"], Field::FiftyTwoWeekHigh, Kind::Float),
    m(&["fiftyTwoWeekLow"], Field::FiftyTwoWeekLow, Kind::Float),
    m(&["volume"], Field::Volume, Kind::Int),
    m(&["regularMarketVolume"], Field::Volume, Kind::Int),
    m(&["averageVolume"], Field::AverageVolume, Kind::Int),
    m(&["averageVolume10days"], Field::AverageVolume, Kind::Int),
    m(&["marketCap"], Field::MarketCap, Kind::Int),
    m(&["currency"], Field::Currency, Kind::Text),
];

const KEY_STATISTICS_FIELDS: &[Mapping] = &[
    m(&["floatShares"], Field::FloatShares, Kind::Int),
    m(&["sharesShort"], Field::ShortInterestShares, Kind::Int),
    m(&["shortPercentOfFloat"], Field::PctFloatShort, Kind::Float),
    m(&["sharesOutstanding"], Field::SharesOutstanding, Kind::Int),
    m(&["impliedSharesOutstanding"], Field::SharesOutstanding, Kind::Int),
    m(&["heldPercentInstitutions"], Field::InstitutionalOwnership, Kind::Float),
    m(&["marketCap"], Field::MarketCap, Kind::Int),
    m(&["sector"], Field::Sector, Kind::Text),
];

const FINANCIAL_DATA_FIELDS: &[Mapping] = &[
    m(&["totalCash"], Field::TotalCash, Kind::Int),
    m(&["freeCashflow"], Field::FreeCashFlow, Kind::Int),
    m(&["currentPrice"], Field::RegularMarketPrice, Kind::Float),
    m(&["targetHighPrice"], Field::TargetHighPrice, Kind::Float),
    m(&["targetLowPrice"], Field::TargetLowPrice, Kind::Float),
    m(&["targetMeanPrice"], Field::TargetMeanPrice, Kind::Float),
    m(&["recommendationMean"], Field::RecommendationMean, Kind::Float),
    m(&["numberOfAnalystOpinions"], Field::NumberOfAnalystOpinions, Kind::Int),
    m(&["financialCurrency"], Field::Currency, Kind::Text),
];

const CALENDAR_FIELDS: &[Mapping] = &[
    m(&["earnings", "earningsDate"], Field::NextEarningsDate, Kind::Date),
    m(&["earnings", "earningsAverage"], Field::EarningsAverage, Kind::Float),
    m(&["earnings", "earningsLow"], Field::EarningsLow, Kind::Float),
    m(&["earnings", "earningsHigh"], Field::EarningsHigh, Kind::Float),
    m(&["earnings", "revenueAverage"], Field::RevenueAverage, Kind::Int),
    m(&["earnings", "revenueLow"], Field::RevenueLow, Kind::Int),
    m(&["earnings", "revenueHigh"], Field::RevenueHigh, Kind::Int),
    m(&["exDividendDate"], Field::ExDividendDate, Kind::Date),
    m(&["ipoDate"], Field::IpoDate, Kind::Date),
];

const PROFILE_FIELDS: &[Mapping] = &[
    m(&["sector"], Field::Sector, Kind::Text),
    m(&["industry"], Field::Industry, Kind::Text),
];

fn apply(raw: &Value, table: &[Mapping]) -> PartialRecord {
    let mut record = PartialRecord::new();
    for mapping in table {
        let Some(value) = get_path(raw, mapping.path) else { continue };
        match mapping.kind {
            Kind::Int => record.fill_int(mapping.field, as_int(value)),
            Kind::Float => record.fill_float(mapping.field, as_float(value)),
            Kind::Text => record.fill_text(mapping.field, as_text(value)),
            Kind::Date => {
                // Earnings dates arrive as a list; the first entry is the next one.
                let value = match value {
                    Value::Array(items) => match items.first() {
                        Some(first) => first,
                        None => continue,
                    },
                    other => other,
                };
                record.fill_date(mapping.field, parse_calendar_date(value))
            }
        };
    }
    record
}

/// Lightweight flat quote.
pub fn extract_quote(raw: &Value) -> PartialRecord {
    apply(raw, QUOTE_FIELDS)
}

pub fn extract_price(raw: &Value) -> PartialRecord {
    apply(raw, PRICE_FIELDS)
}

pub fn extract_quote_type(raw: &Value) -> PartialRecord {
    apply(raw, QUOTE_TYPE_FIELDS)
}

pub fn extract_summary_detail(raw: &Value) -> PartialRecord {
    apply(raw, SUMMARY_DETAIL_FIELDS)
}

/// Fundamentals: float, short interest, share count, ownership.
pub fn extract_key_statistics(raw: &Value) -> PartialRecord {
    apply(raw, KEY_STATISTICS_FIELDS)
}

pub fn extract_financial_data(raw: &Value) -> PartialRecord {
    apply(raw, FINANCIAL_DATA_FIELDS)
}

pub fn extract_calendar_events(raw: &Value) -> PartialRecord {
    apply(raw, CALENDAR_FIELDS)
}

fn extract_profile(raw: &Value) -> PartialRecord {
    let mut record = apply(raw, PROFILE_FIELDS);
    let description = safe_get(raw, "longBusinessSummary")
        .and_then(Value::as_str)
        .and_then(normalize_description);
    record.fill_text(Field::Description, description);
    record
}

pub fn extract_summary_profile(raw: &Value) -> PartialRecord {
    extract_profile(raw)
}

pub fn extract_asset_profile(raw: &Value) -> PartialRecord {
    extract_profile(raw)
}

/// Ownership time series: the most recent report with a usable percentage.
pub fn extract_institution_ownership(raw: &Value) -> PartialRecord {
    let mut record = PartialRecord::new();
    let Some(entries) = safe_get(raw, "ownershipList").and_then(Value::as_array) else {
        return record;
    };

    let readings: Vec<_> = entries
        .iter()
        .filter_map(|entry| {
            let pct = safe_get(entry, "pctHeld").and_then(as_float)?;
            let date = safe_get(entry, "reportDate").and_then(parse_calendar_date);
            Some((date, pct))
        })
        .collect();

    let latest = readings
        .iter()
        .filter(|(date, _)| date.is_some())
        .max_by_key(|(date, _)| *date)
        .or_else(|| readings.first())
        .map(|(_, pct)| *pct);

    record.fill_float(Field::InstitutionalOwnership, latest);
    record
}

/// Flat institutional-ownership percentage.
pub fn extract_major_holders(raw: &Value) -> PartialRecord {
    let mut record = PartialRecord::new();
    record.fill_float(
        Field::InstitutionalOwnership,
        safe_get(raw, "institutionsPercentHeld").and_then(as_float),
    );
    record
}

/// Ownership from whichever variants a response carries, time series first.
pub fn extract_ownership(response: &Value) -> PartialRecord {
    let mut record = PartialRecord::new();
    if let Some(series) = safe_get(response, SummaryModule::InstitutionOwnership.as_str()) {
        record.merge_into(extract_institution_ownership(series));
    }
    if let Some(flat) = safe_get(response, SummaryModule::MajorHoldersBreakdown.as_str()) {
        record.merge_into(extract_major_holders(flat));
    }
    record
}

type Extractor = fn(&Value) -> PartialRecord;

/// Precedence order used when one response carries several modules.
const MODULE_EXTRACTORS: &[(SummaryModule, Extractor)] = &[
    (SummaryModule::Price, extract_price),
    (SummaryModule::QuoteType, extract_quote_type),
    (SummaryModule::SummaryDetail, extract_summary_detail),
    (SummaryModule::DefaultKeyStatistics, extract_key_statistics),
    (SummaryModule::FinancialData, extract_financial_data),
    (SummaryModule::CalendarEvents, extract_calendar_events),
    (SummaryModule::SummaryProfile, extract_summary_profile),
    (SummaryModule::AssetProfile, extract_asset_profile),
];

/// Every module present in a multi-module response.
pub fn extract_comprehensive(response: &Value) -> PartialRecord {
    let mut record = extract_ownership(response);
    for (module, extractor) in MODULE_EXTRACTORS {
        if let Some(payload) = safe_get(response, module.as_str()) {
            record.merge_into(extractor(payload));
        }
    }
    record
}

/// Collapse a business summary to its first sentence, or truncate a single
/// long sentence with an ellipsis.
pub fn normalize_description(text: &str) -> Option<String> {
    let desc = text.trim().replace('\n', " ");
    if desc.is_empty() {
        return None;
    }

    let mut sentences = desc.split(". ");
    let first = sentences.next().unwrap_or_default();
    if sentences.next().is_some() {
        return Some(format!("{}.", first.trim()));
    }

    let head: String = desc.chars().take(DESCRIPTION_MAX_CHARS).collect();
    let mut out = head.trim().to_string();
    if desc.chars().count() > DESCRIPTION_MAX_CHARS {
        out.push('…');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_extractors_are_total_over_odd_shapes() {
        let shapes = [json!({}), json!(null), json!([1, 2, 3]), json!("text"), json!(42)];
        for shape in &shapes {
            assert!(extract_quote(shape).is_empty());
            assert!(extract_price(shape).is_empty());
            assert!(extract_summary_detail(shape).is_empty());
            assert!(extract_key_statistics(shape).is_empty());
            assert!(extract_financial_data(shape).is_empty());
            assert!(extract_calendar_events(shape).is_empty());
            assert!(extract_summary_profile(shape).is_empty());
            assert!(extract_institution_ownership(shape).is_empty());
            assert!(extract_comprehensive(shape).is_empty());
        }
    }

    #[test]
    fn test_quote_extraction() {
        let quote = json!({
            "regularMarketPrice": 12.5,
            "regularMarketVolume": 1_200_000,
            "averageDailyVolume3Month": null,
            "averageDailyVolume10Day": 900_000,
            "marketCap": 5_000_000_000i64,
            "currency": "USD",
            "fullExchangeName": "NasdaqGS",
            "exchange": "NMS",
            "shortName": "Widgets Inc",
        });
        let r = extract_quote(&quote);
        assert_eq!(r.float(Field::RegularMarketPrice), Some(12.5));
        assert_eq!(r.int(Field::Volume), Some(1_200_000));
        assert_eq!(r.int(Field::AverageVolume), Some(900_000));
        assert_eq!(r.int(Field::MarketCap), Some(5_000_000_000));
        assert_eq!(r.text(Field::Exchange), Some("NasdaqGS"));
        assert_eq!(r.text(Field::CompanyName), Some("Widgets Inc"));
    }

    #[test]
    fn test_key_statistics_with_raw_wrappers_and_nan() {
        let stats = json!({
            "floatShares": {"raw": 15_000_000.7, "fmt": "15M"},
            "sharesShort": "4000000",
            "sharesOutstanding": "NaN",
            "impliedSharesOutstanding": 21_000_000,
            "heldPercentInstitutions": 0.42,
        });
        let r = extract_key_statistics(&stats);
        assert_eq!(r.int(Field::FloatShares), Some(15_000_000));
        assert_eq!(r.int(Field::ShortInterestShares), Some(4_000_000));
        assert_eq!(r.int(Field::SharesOutstanding), Some(21_000_000));
        assert_eq!(r.float(Field::InstitutionalOwnership), Some(0.42));
        assert!(!r.has(Field::PctFloatShort));
    }

    #[test]
    fn test_calendar_events_date_encodings() {
        let calendar = json!({
            "earnings": {
                "earningsDate": [{"raw": 1714521600, "fmt": "2024-05-01"}, 1722470400],
                "earningsAverage": 0.12,
                "revenueAverage": {"raw": 250_000_000},
            },
            "exDividendDate": "2024-03-15T00:00:00.000Z",
            "ipoDate": "not a date",
        });
        let r = extract_calendar_events(&calendar);
        assert_eq!(r.date(Field::NextEarningsDate), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(r.date(Field::ExDividendDate), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(r.float(Field::EarningsAverage), Some(0.12));
        assert_eq!(r.int(Field::RevenueAverage), Some(250_000_000));
        assert!(!r.has(Field::IpoDate));
    }

    #[test]
    fn test_profile_description_normalized() {
        let profile = json!({
            "sector": "Healthcare",
            "longBusinessSummary": "Acme Bio develops therapies.\nIt was founded in 2010. It is based in Boston.",
        });
        let r = extract_summary_profile(&profile);
        assert_eq!(r.text(Field::Sector), Some("Healthcare"));
        assert_eq!(r.text(Field::Description), Some("Acme Bio develops therapies."));
    }

    #[test]
    fn test_normalize_description_first_sentence() {
        assert_eq!(
            normalize_description("First part. Second part. Third."),
            Some("First part.".to_string())
        );
        assert_eq!(normalize_description("   "), None);
    }

    #[test]
    fn test_normalize_description_truncates_single_sentence() {
        let long = "x".repeat(300);
        let out = normalize_description(&long).unwrap();
        assert_eq!(out.chars().count(), DESCRIPTION_MAX_CHARS + 1);
        assert!(out.ends_with('…'));

        let exact = "y".repeat(DESCRIPTION_MAX_CHARS);
        assert_eq!(normalize_description(&exact), Some(exact.clone()));
    }

    #[test]
    fn test_ownership_prefers_latest_time_series_entry() {
        let response = json!({
            "institutionOwnership": {
                "ownershipList": [
                    {"reportDate": {"raw": 1696032000}, "pctHeld": {"raw": 0.30}},
                    {"reportDate": {"raw": 1711843200}, "pctHeld": {"raw": 0.35}},
                    {"reportDate": null, "pctHeld": {"raw": 0.99}},
                ]
            },
            "majorHoldersBreakdown": {"institutionsPercentHeld": 0.5},
        });
        let r = extract_ownership(&response);
        assert_eq!(r.float(Field::InstitutionalOwnership), Some(0.35));

        let flat_only = json!({"majorHoldersBreakdown": {"institutionsPercentHeld": 0.5}});
        assert_eq!(extract_ownership(&flat_only).float(Field::InstitutionalOwnership), Some(0.5));
    }

    #[test]
    fn test_comprehensive_precedence_and_longer_description() {
        let response = json!({
            "price": {"marketCap": 100, "regularMarketPrice": 2.0},
            "summaryDetail": {"marketCap": 999, "fiftyTwoWeekHigh": 3.0},
            "summaryProfile": {"sector": "Energy", "longBusinessSummary": "Short."},
            "assetProfile": {"sector": "Utilities", "longBusinessSummary": "A considerably longer one."},
        });
        let r = extract_comprehensive(&response);
        assert_eq!(r.int(Field::MarketCap), Some(100));
        assert_eq!(r.float(Field::FiftyTwoWeekHigh), Some(3.0));
        assert_eq!(r.text(Field::Sector), Some("Energy"));
        assert_eq!(r.text(Field::Description), Some("A considerably longer one."));
    }
}
