use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modules of the comprehensive (multi-module) summary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryModule {
    Price,
    QuoteType,
    SummaryDetail,
    SummaryProfile,
    DefaultKeyStatistics,
    FinancialData,
    CalendarEvents,
    AssetProfile,
    InstitutionOwnership,
    MajorHoldersBreakdown,
}

impl SummaryModule {
    /// Key under which the module's payload appears in a comprehensive response.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryModule::Price => "price",
            SummaryModule::QuoteType => "quoteType",
            SummaryModule::SummaryDetail => "summaryDetail",
            SummaryModule::SummaryProfile => "summaryProfile",
            SummaryModule::DefaultKeyStatistics => "defaultKeyStatistics",
            SummaryModule::FinancialData => "financialData",
            SummaryModule::CalendarEvents => "calendarEvents",
            SummaryModule::AssetProfile => "assetProfile",
            SummaryModule::InstitutionOwnership => "institutionOwnership",
            SummaryModule::MajorHoldersBreakdown => "majorHoldersBreakdown",
        }
    }
}

impl fmt::Display for SummaryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity of a fundamentals time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesInterval {
    Quarterly,
    Annual,
}

impl fmt::Display for SeriesInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesInterval::Quarterly => f.write_str("quarterly"),
            SeriesInterval::Annual => f.write_str("annual"),
        }
    }
}

/// Provenance tag: which provider call contributed to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "quoteSummary:comprehensive")]
    Comprehensive,
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "quoteSummary:summaryDetail")]
    SummaryDetail,
    #[serde(rename = "quoteSummary:defaultKeyStatistics")]
    KeyStatistics,
    #[serde(rename = "quoteSummary:summaryProfile")]
    SummaryProfile,
    #[serde(rename = "quoteSummary:assetProfile")]
    AssetProfile,
    #[serde(rename = "quoteSummary:price")]
    Price,
    #[serde(rename = "quoteSummary:institutionOwnership")]
    InstitutionOwnership,
    #[serde(rename = "quoteSummary:majorHoldersBreakdown")]
    MajorHolders,
    #[serde(rename = "quoteSummary:alternative")]
    Alternative,
    #[serde(rename = "search:verified")]
    SymbolCheck,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Comprehensive => "quoteSummary:comprehensive",
            Source::Quote => "quote",
            Source::SummaryDetail => "quoteSummary:summaryDetail",
            Source::KeyStatistics => "quoteSummary:defaultKeyStatistics",
            Source::SummaryProfile => "quoteSummary:summaryProfile",
            Source::AssetProfile => "quoteSummary:assetProfile",
            Source::Price => "quoteSummary:price",
            Source::InstitutionOwnership => "quoteSummary:institutionOwnership",
            Source::MajorHolders => "quoteSummary:majorHoldersBreakdown",
            Source::Alternative => "quoteSummary:alternative",
            Source::SymbolCheck => "search:verified",
        }
    }

    /// Sources that carry live trading data rather than fundamentals.
    pub fn is_price_like(&self) -> bool {
        matches!(self, Source::Quote | Source::Price)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How complete a snapshot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Complete,
    Partial,
    Minimal,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub quality: DataQuality,
    pub message: Option<String>,
}

/// Insider activity over the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsiderAggregate {
    /// Signed buy-minus-sell value.
    pub net_buying: f64,
    pub transaction_count: u32,
    /// Signed, role-weighted value from officers and directors.
    pub executive_buying: f64,
    pub cluster_detected: bool,
}

/// Last reverse split, when a provider can report one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseSplit {
    pub date: Option<NaiveDate>,
    pub ratio: Option<String>,
}

/// Point-in-time financial snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSnapshot {
    pub ticker: String,
    #[serde(rename = "float")]
    pub float_shares: Option<i64>,
    pub short_float_shares: Option<i64>,
    pub pct_float_short: Option<f64>,
    pub institutional_ownership: Option<f64>,
    pub last_reverse_split_date: Option<NaiveDate>,
    pub reverse_split_ratio: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub company_name: Option<String>,
    pub company_description: Option<String>,
    pub market_cap: Option<i64>,
    pub total_cash: Option<i64>,
    #[serde(rename = "freeCashFlowTTM")]
    pub free_cash_flow_ttm: Option<i64>,
    pub cash_runway_months: Option<f64>,
    pub shares_outstanding: Option<i64>,
    #[serde(rename = "dilutionYoY")]
    pub dilution_yoy: Option<f64>,
    #[serde(rename = "insiderBuyNet90d")]
    pub insider_buy_net_90d: Option<f64>,
    pub insider_transaction_data: Option<InsiderAggregate>,
    pub flags: Vec<String>,
    pub data_quality: DataQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_quality_message: Option<String>,
    pub sources: Vec<Source>,
    pub symbol_verified: Option<bool>,
    pub last_updated: DateTime<Utc>,

    // Price & trading
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub volume: Option<i64>,
    pub average_volume: Option<i64>,

    // Analysts
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub recommendation_mean: Option<f64>,
    pub number_of_analyst_opinions: Option<i64>,

    // Calendar & earnings estimates
    pub ipo_date: Option<NaiveDate>,
    pub next_earnings_date: Option<NaiveDate>,
    pub ex_dividend_date: Option<NaiveDate>,
    pub earnings_average: Option<f64>,
    pub earnings_low: Option<f64>,
    pub earnings_high: Option<f64>,
    pub revenue_average: Option<i64>,
    pub revenue_low: Option<i64>,
    pub revenue_high: Option<i64>,

    pub currency: Option<String>,
    pub exchange: Option<String>,
}
