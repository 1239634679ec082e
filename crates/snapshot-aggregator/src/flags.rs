use chrono::NaiveDate;
use snapshot_core::InsiderAggregate;

/// Everything the flag rules look at.
#[derive(Debug, Clone, Default)]
pub struct FlagInputs {
    pub float_shares: Option<i64>,
    pub pct_float_short: Option<f64>,
    pub reverse_split_date: Option<NaiveDate>,
    pub cash_runway_months: Option<f64>,
    pub dilution_yoy: Option<f64>,
    pub insider: Option<InsiderAggregate>,
    pub market_cap: Option<i64>,
}

/// Insider dollar thresholds, scaled down for smaller companies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsiderThresholds {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

impl InsiderThresholds {
    pub fn for_market_cap(market_cap: Option<i64>) -> Self {
        let small = match market_cap {
            Some(cap) if cap < 100_000_000 => 50_000.0,
            _ => 100_000.0,
        };
        let medium = match market_cap {
            Some(cap) if cap < 1_000_000_000 => 250_000.0,
            _ => 500_000.0,
        };
        Self {
            small,
            medium,
            large: 1_000_000.0,
        }
    }
}

const LOW_FLOAT_SHARES: i64 = 20_000_000;
const HIGH_SHORT_RATIO: f64 = 0.2;
const SHORT_RUNWAY_MONTHS: f64 = 12.0;
const HIGH_DILUTION: f64 = 0.20;
const MODERATE_DILUTION: f64 = 0.10;
const BUYBACK: f64 = -0.05;

type Rule = fn(&FlagInputs) -> Option<String>;

/// Evaluated in order; each rule contributes at most one flag.
const RULES: &[Rule] = &[
    high_short_low_float,
    reverse_split_history,
    short_cash_runway,
    dilution,
    buyback,
    insider_buying,
    insider_selling,
];

fn high_short_low_float(inputs: &FlagInputs) -> Option<String> {
    let float_shares = inputs.float_shares?;
    let short_ratio = inputs.pct_float_short?;
    (float_shares < LOW_FLOAT_SHARES && short_ratio > HIGH_SHORT_RATIO)
        .then(|| "High short + Low float".to_string())
}

fn reverse_split_history(inputs: &FlagInputs) -> Option<String> {
    inputs
        .reverse_split_date
        .map(|_| "Has reverse split history".to_string())
}

fn short_cash_runway(inputs: &FlagInputs) -> Option<String> {
    (inputs.cash_runway_months? < SHORT_RUNWAY_MONTHS).then(|| "Cash runway < 12mo (est.)".to_string())
}

fn dilution(inputs: &FlagInputs) -> Option<String> {
    let change = inputs.dilution_yoy?;
    if change > HIGH_DILUTION {
        Some(format!("High dilution: shares +{:.1}% YoY", change * 100.0))
    } else if change > MODERATE_DILUTION {
        Some(format!("Shares up {:.1}% YoY (dilution?)", change * 100.0))
    } else {
        None
    }
}

fn buyback(inputs: &FlagInputs) -> Option<String> {
    let change = inputs.dilution_yoy?;
    (change < BUYBACK).then(|| format!("Share count down {:.1}% YoY (buyback)", change.abs() * 100.0))
}

fn insider_buying(inputs: &FlagInputs) -> Option<String> {
    let insider = inputs.insider.as_ref()?;
    let thresholds = InsiderThresholds::for_market_cap(inputs.market_cap);
    let net = insider.net_buying;
    let generic = || format!("Insider net buying: {} (90d)", format_currency(net));

    if net > thresholds.large || (insider.cluster_detected && net > thresholds.small) {
        if insider.cluster_detected {
            Some(format!("Insider cluster buying: {} (90d)", format_currency(net)))
        } else if insider.executive_buying > thresholds.medium {
            Some(format!(
                "Executive buying: {} (90d)",
                format_currency(insider.executive_buying)
            ))
        } else {
            Some(generic())
        }
    } else if net > thresholds.small && !insider.cluster_detected {
        Some(generic())
    } else {
        None
    }
}

fn insider_selling(inputs: &FlagInputs) -> Option<String> {
    let insider = inputs.insider.as_ref()?;
    let thresholds = InsiderThresholds::for_market_cap(inputs.market_cap);
    (insider.net_buying < -thresholds.small).then(|| {
        format!(
            "Insider net selling: {} (90d)",
            format_currency(insider.net_buying.abs())
        )
    })
}

pub fn generate_flags(inputs: &FlagInputs) -> Vec<String> {
    RULES.iter().filter_map(|rule| rule(inputs)).collect()
}

/// Lower bound, divisor and suffix per unit. Each bound sits where the unit
/// below would print 1000 after rounding.
const UNITS: &[(f64, f64, &str)] = &[
    (999_995_000.0, 1e9, "B"),
    (999_995.0, 1e6, "M"),
    (1_000.0, 1e3, "K"),
];

/// Compact dollar amount: `$1.50B`, `$250.00K`, `$999`.
pub fn format_currency(value: f64) -> String {
    let abs = value.abs().round();
    let sign = if value < 0.0 && abs > 0.0 { "-" } else { "" };
    match UNITS.iter().find(|(bound, _, _)| abs >= *bound) {
        Some((_, divisor, suffix)) => format!("{}${:.2}{}", sign, abs / divisor, suffix),
        None => format!("{}${:.0}", sign, abs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insider(net: f64, executive: f64, cluster: bool) -> Option<InsiderAggregate> {
        Some(InsiderAggregate {
            net_buying: net,
            transaction_count: 3,
            executive_buying: executive,
            cluster_detected: cluster,
        })
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1_500_000_000.0), "$1.50B");
        assert_eq!(format_currency(2_345_678.0), "$2.35M");
        assert_eq!(format_currency(250_000.0), "$250.00K");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(-1_200_000.0), "-$1.20M");
    }

    #[test]
    fn test_format_currency_rounds_into_next_unit() {
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(999.6), "$1.00K");
        assert_eq!(format_currency(999_999.0), "$1.00M");
        assert_eq!(format_currency(999_999_999.0), "$1.00B");
        assert_eq!(format_currency(-0.2), "$0");
    }

    #[test]
    fn test_thresholds_by_market_cap() {
        let micro = InsiderThresholds::for_market_cap(Some(50_000_000));
        assert_eq!((micro.small, micro.medium), (50_000.0, 250_000.0));
        let small = InsiderThresholds::for_market_cap(Some(500_000_000));
        assert_eq!((small.small, small.medium), (100_000.0, 250_000.0));
        let large = InsiderThresholds::for_market_cap(Some(5_000_000_000));
        assert_eq!((large.small, large.medium, large.large), (100_000.0, 500_000.0, 1_000_000.0));
        assert_eq!(InsiderThresholds::for_market_cap(None), large);
    }

    #[test]
    fn test_high_short_low_float() {
        let inputs = FlagInputs {
            float_shares: Some(15_000_000),
            pct_float_short: Some(4_000_000.0 / 15_000_000.0),
            ..Default::default()
        };
        assert_eq!(generate_flags(&inputs), vec!["High short + Low float"]);

        let big_float = FlagInputs {
            float_shares: Some(25_000_000),
            ..inputs
        };
        assert!(generate_flags(&big_float).is_empty());
    }

    #[test]
    fn test_runway_boundary_is_strict() {
        let at_twelve = FlagInputs {
            cash_runway_months: Some(12.0),
            ..Default::default()
        };
        assert!(generate_flags(&at_twelve).is_empty());

        let below = FlagInputs {
            cash_runway_months: Some(11.9),
            ..Default::default()
        };
        assert_eq!(generate_flags(&below), vec!["Cash runway < 12mo (est.)"]);
    }

    #[test]
    fn test_dilution_and_buyback() {
        let high = FlagInputs {
            dilution_yoy: Some(0.35),
            ..Default::default()
        };
        assert_eq!(generate_flags(&high), vec!["High dilution: shares +35.0% YoY"]);

        let moderate = FlagInputs {
            dilution_yoy: Some(0.15),
            ..Default::default()
        };
        assert_eq!(generate_flags(&moderate), vec!["Shares up 15.0% YoY (dilution?)"]);

        let buyback = FlagInputs {
            dilution_yoy: Some(-0.08),
            ..Default::default()
        };
        assert_eq!(generate_flags(&buyback), vec!["Share count down 8.0% YoY (buyback)"]);

        let flat = FlagInputs {
            dilution_yoy: Some(0.02),
            ..Default::default()
        };
        assert!(generate_flags(&flat).is_empty());
    }

    #[test]
    fn test_insider_buying_priority() {
        let cluster = FlagInputs {
            insider: insider(150_000.0, 0.0, true),
            market_cap: Some(5_000_000_000),
            ..Default::default()
        };
        assert_eq!(generate_flags(&cluster), vec!["Insider cluster buying: $150.00K (90d)"]);

        let executive = FlagInputs {
            insider: insider(1_200_000.0, 2_000_000.0, false),
            market_cap: Some(5_000_000_000),
            ..Default::default()
        };
        assert_eq!(generate_flags(&executive), vec!["Executive buying: $2.00M (90d)"]);

        let generic = FlagInputs {
            insider: insider(60_000.0, 0.0, false),
            market_cap: Some(50_000_000),
            ..Default::default()
        };
        assert_eq!(generate_flags(&generic), vec!["Insider net buying: $60.00K (90d)"]);

        let below = FlagInputs {
            insider: insider(60_000.0, 0.0, false),
            market_cap: Some(5_000_000_000),
            ..Default::default()
        };
        assert!(generate_flags(&below).is_empty());
    }

    #[test]
    fn test_insider_selling() {
        let selling = FlagInputs {
            insider: insider(-300_000.0, -450_000.0, false),
            market_cap: Some(500_000_000),
            ..Default::default()
        };
        assert_eq!(generate_flags(&selling), vec!["Insider net selling: $300.00K (90d)"]);
    }

    #[test]
    fn test_flags_keep_rule_order() {
        let inputs = FlagInputs {
            float_shares: Some(10_000_000),
            pct_float_short: Some(0.3),
            reverse_split_date: NaiveDate::from_ymd_opt(2023, 1, 5),
            cash_runway_months: Some(6.0),
            dilution_yoy: Some(0.5),
            insider: insider(-2_000_000.0, 0.0, false),
            market_cap: Some(80_000_000),
        };
        assert_eq!(
            generate_flags(&inputs),
            vec![
                "High short + Low float",
                "Has reverse split history",
                "Cash runway < 12mo (est.)",
                "High dilution: shares +50.0% YoY",
                "Insider net selling: $2.00M (90d)",
            ]
        );
    }
}
