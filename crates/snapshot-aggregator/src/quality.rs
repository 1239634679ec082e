use snapshot_core::{DataQuality, Field, PartialRecord, QualityAssessment, Source};

const CHECKLIST_LEN: f64 = 4.0;

fn coverage(record: &PartialRecord) -> f64 {
    let checks = [
        record.has(Field::MarketCap),
        record.has(Field::SharesOutstanding),
        record.has(Field::Sector),
        record.has(Field::FloatShares) || record.has(Field::SharesOutstanding),
    ];
    checks.iter().filter(|c| **c).count() as f64 / CHECKLIST_LEN
}

fn assessment(quality: DataQuality, message: Option<&str>) -> QualityAssessment {
    QualityAssessment {
        quality,
        message: message.map(str::to_string),
    }
}

/// Classify how complete a merged record is, given which sources contributed.
///
/// Recently listed companies (IPO date known) do not report a share count
/// for a while, so they are graded on market cap alone with lower coverage
/// thresholds.
pub fn assess_quality(record: &PartialRecord, sources: &[Source]) -> QualityAssessment {
    let ratio = coverage(record);
    let has_market_cap = record.has(Field::MarketCap);
    let has_comprehensive = sources.contains(&Source::Comprehensive);

    if record.has(Field::IpoDate) {
        return if has_comprehensive && has_market_cap {
            if ratio >= 0.6 {
                assessment(DataQuality::Complete, None)
            } else if ratio >= 0.4 {
                assessment(
                    DataQuality::Partial,
                    Some("Recently listed company: some fields not yet reported"),
                )
            } else {
                assessment(
                    DataQuality::Partial,
                    Some("Limited data available for this recently listed company"),
                )
            }
        } else if has_market_cap {
            assessment(
                DataQuality::Minimal,
                Some("Only market capitalization available for recent IPO"),
            )
        } else {
            assessment(DataQuality::Unavailable, Some("Market data unavailable"))
        };
    }

    let has_required = has_market_cap && record.has(Field::SharesOutstanding);
    if has_comprehensive && has_required && ratio >= 0.75 {
        assessment(DataQuality::Complete, None)
    } else if has_required && ratio >= 0.5 {
        assessment(
            DataQuality::Partial,
            Some("Some fields unavailable from data providers"),
        )
    } else if has_market_cap && sources.iter().any(Source::is_price_like) {
        assessment(
            DataQuality::Partial,
            Some("Trading data only; fundamentals unavailable"),
        )
    } else if has_market_cap {
        assessment(DataQuality::Minimal, Some("Only basic market data available"))
    } else {
        assessment(DataQuality::Unavailable, Some("Market data unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(fields: &[Field]) -> PartialRecord {
        let mut r = PartialRecord::new();
        for field in fields {
            match field {
                Field::Sector => r.fill_text(*field, Some("Technology".to_string())),
                Field::IpoDate => r.fill_date(*field, NaiveDate::from_ymd_opt(2024, 2, 1)),
                _ => r.fill_int(*field, Some(1_000_000)),
            };
        }
        r
    }

    #[test]
    fn test_complete_with_comprehensive_source() {
        let r = record(&[Field::MarketCap, Field::SharesOutstanding, Field::Sector]);
        let q = assess_quality(&r, &[Source::Comprehensive]);
        assert_eq!(q.quality, DataQuality::Complete);
        assert_eq!(q.message, None);
    }

    #[test]
    fn test_required_fields_without_comprehensive_is_partial() {
        let r = record(&[Field::MarketCap, Field::SharesOutstanding, Field::Sector]);
        let q = assess_quality(&r, &[Source::Quote, Source::SummaryProfile]);
        assert_eq!(q.quality, DataQuality::Partial);
    }

    #[test]
    fn test_quote_only_market_cap_is_never_complete() {
        let r = record(&[Field::MarketCap, Field::RegularMarketPrice, Field::Volume]);
        let q = assess_quality(&r, &[Source::Quote]);
        assert_eq!(q.quality, DataQuality::Partial);
        assert_eq!(q.message.as_deref(), Some("Trading data only; fundamentals unavailable"));

        let q = assess_quality(&r, &[Source::Alternative]);
        assert_eq!(q.quality, DataQuality::Minimal);
    }

    #[test]
    fn test_no_market_cap_is_unavailable() {
        let r = record(&[Field::Sector]);
        let q = assess_quality(&r, &[Source::Comprehensive]);
        assert_eq!(q.quality, DataQuality::Unavailable);
        assert!(q.message.is_some());
    }

    #[test]
    fn test_ipo_branch_thresholds() {
        // marketCap + sector = 0.5 coverage.
        let r = record(&[Field::IpoDate, Field::MarketCap, Field::Sector]);
        assert_eq!(assess_quality(&r, &[Source::Comprehensive]).quality, DataQuality::Partial);

        // marketCap + float + sector = 0.75 coverage.
        let r = record(&[Field::IpoDate, Field::MarketCap, Field::FloatShares, Field::Sector]);
        assert_eq!(assess_quality(&r, &[Source::Comprehensive]).quality, DataQuality::Complete);

        let r = record(&[Field::IpoDate, Field::MarketCap]);
        let q = assess_quality(&r, &[Source::Comprehensive]);
        assert_eq!(q.quality, DataQuality::Partial);
        assert_eq!(
            q.message.as_deref(),
            Some("Limited data available for this recently listed company")
        );

        let q = assess_quality(&r, &[Source::Quote]);
        assert_eq!(q.quality, DataQuality::Minimal);
    }
}
