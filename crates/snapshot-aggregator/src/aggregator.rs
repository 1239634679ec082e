//! Fallback cascade over a single provider.
//!
//! A pull walks an ordered table of steps. Each step has a precondition over
//! what has been gathered so far and one provider call; a failed call is
//! logged and skipped. Fields are merged with [`PartialRecord::merge_into`],
//! so whichever step populates a field first owns it.

use chrono::{DateTime, Utc};
use snapshot_core::{
    Field, FinancialDataProvider, PartialRecord, SnapshotError, Source, SummaryModule,
    TickerSnapshot,
};
use tracing::{debug, info, warn};

use crate::config::AggregatorConfig;
use crate::derived::{cash_runway_months, detect_last_reverse_split, dilution_yoy, pct_float_short};
use crate::extractors::{extract_comprehensive, extract_quote};
use crate::flags::{generate_flags, FlagInputs};
use crate::insider::{fetch_insider_aggregate, price_estimate};
use crate::quality::assess_quality;

const COMPREHENSIVE_MODULES: &[SummaryModule] = &[
    SummaryModule::Price,
    SummaryModule::QuoteType,
    SummaryModule::SummaryDetail,
    SummaryModule::SummaryProfile,
    SummaryModule::DefaultKeyStatistics,
    SummaryModule::FinancialData,
    SummaryModule::CalendarEvents,
    SummaryModule::AssetProfile,
];

const ALTERNATIVE_MODULES: &[SummaryModule] = &[
    SummaryModule::Price,
    SummaryModule::QuoteType,
    SummaryModule::SummaryDetail,
    SummaryModule::DefaultKeyStatistics,
    SummaryModule::CalendarEvents,
];

const FLOAT_FIELDS: &[Field] = &[Field::FloatShares, Field::ShortInterestShares, Field::PctFloatShort];
const SECTOR_FIELDS: &[Field] = &[Field::Sector];
const OWNERSHIP_FIELDS: &[Field] = &[Field::InstitutionalOwnership];

/// Per-request accumulator. Never shared between pulls.
#[derive(Debug, Default)]
struct CascadeState {
    record: PartialRecord,
    sources: Vec<Source>,
    comprehensive_failed: bool,
    any_succeeded: bool,
    rate_limited: bool,
    symbol_exists: Option<bool>,
}

impl CascadeState {
    fn succeeded(&mut self, source: Source) {
        self.any_succeeded = true;
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    fn failed(&mut self, source: Source, error: &SnapshotError) {
        if source == Source::Comprehensive {
            self.comprehensive_failed = true;
        }
        if error.is_rate_limited() {
            self.rate_limited = true;
        }
    }

    fn missing(&self, field: Field) -> bool {
        !self.record.has(field)
    }
}

#[derive(Debug, Clone, Copy)]
enum Fetch {
    Summary(&'static [SummaryModule]),
    Quote,
    VerifySymbol,
}

struct Step {
    source: Source,
    when: fn(&CascadeState) -> bool,
    fetch: Fetch,
    /// Restrict what this step may contribute.
    keep: Option<&'static [Field]>,
}

fn always(_: &CascadeState) -> bool {
    true
}

fn trading_incomplete(s: &CascadeState) -> bool {
    s.comprehensive_failed || Field::TRADING.iter().any(|f| s.missing(*f))
}

fn range_or_volume_missing(s: &CascadeState) -> bool {
    s.missing(Field::FiftyTwoWeekHigh) || s.missing(Field::FiftyTwoWeekLow) || s.missing(Field::AverageVolume)
}

fn float_missing(s: &CascadeState) -> bool {
    s.missing(Field::FloatShares)
}

fn sector_missing(s: &CascadeState) -> bool {
    s.missing(Field::Sector)
}

fn market_cap_missing(s: &CascadeState) -> bool {
    s.missing(Field::MarketCap)
}

fn ownership_missing(s: &CascadeState) -> bool {
    s.missing(Field::InstitutionalOwnership)
}

fn size_missing(s: &CascadeState) -> bool {
    s.missing(Field::MarketCap) && s.missing(Field::SharesOutstanding)
}

fn nothing_succeeded(s: &CascadeState) -> bool {
    !s.any_succeeded && s.missing(Field::MarketCap)
}

const STEPS: &[Step] = &[
    Step {
        source: Source::Comprehensive,
        when: always,
        fetch: Fetch::Summary(COMPREHENSIVE_MODULES),
        keep: None,
    },
    Step {
        source: Source::Quote,
        when: trading_incomplete,
        fetch: Fetch::Quote,
        keep: None,
    },
    Step {
        source: Source::SummaryDetail,
        when: range_or_volume_missing,
        fetch: Fetch::Summary(&[SummaryModule::SummaryDetail]),
        keep: None,
    },
    Step {
        source: Source::KeyStatistics,
        when: float_missing,
        fetch: Fetch::Summary(&[SummaryModule::DefaultKeyStatistics]),
        keep: Some(FLOAT_FIELDS),
    },
    Step {
        source: Source::SummaryProfile,
        when: sector_missing,
        fetch: Fetch::Summary(&[SummaryModule::SummaryProfile]),
        keep: Some(SECTOR_FIELDS),
    },
    Step {
        source: Source::AssetProfile,
        when: sector_missing,
        fetch: Fetch::Summary(&[SummaryModule::AssetProfile]),
        keep: Some(SECTOR_FIELDS),
    },
    Step {
        source: Source::Price,
        when: market_cap_missing,
        fetch: Fetch::Summary(&[SummaryModule::Price]),
        keep: None,
    },
    Step {
        source: Source::InstitutionOwnership,
        when: ownership_missing,
        fetch: Fetch::Summary(&[SummaryModule::InstitutionOwnership]),
        keep: Some(OWNERSHIP_FIELDS),
    },
    Step {
        source: Source::MajorHolders,
        when: ownership_missing,
        fetch: Fetch::Summary(&[SummaryModule::MajorHoldersBreakdown]),
        keep: Some(OWNERSHIP_FIELDS),
    },
    Step {
        source: Source::Alternative,
        when: size_missing,
        fetch: Fetch::Summary(ALTERNATIVE_MODULES),
        keep: None,
    },
    Step {
        source: Source::SymbolCheck,
        when: nothing_succeeded,
        fetch: Fetch::VerifySymbol,
        keep: None,
    },
];

/// Builds [`TickerSnapshot`]s from a [`FinancialDataProvider`].
pub struct SnapshotAggregator<P> {
    provider: P,
    config: AggregatorConfig,
}

impl<P: FinancialDataProvider> SnapshotAggregator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AggregatorConfig::default())
    }

    pub fn with_config(provider: P, config: AggregatorConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Snapshot as of the wall clock.
    pub async fn pull(&self, symbol: &str) -> Result<TickerSnapshot, SnapshotError> {
        self.pull_at(symbol, Utc::now()).await
    }

    /// Snapshot with insider windows measured back from `now`.
    ///
    /// Fails with [`SnapshotError::RetrievalFailed`] only when no step
    /// populated a single field.
    pub async fn pull_at(&self, symbol: &str, now: DateTime<Utc>) -> Result<TickerSnapshot, SnapshotError> {
        let symbol = symbol.trim().to_uppercase();
        let mut state = CascadeState::default();

        for step in STEPS {
            if (step.when)(&state) {
                self.run_step(&symbol, step, &mut state).await;
            }
        }

        if state.record.is_empty() {
            warn!("Failed to retrieve any data for {}", symbol);
            return Err(SnapshotError::RetrievalFailed {
                symbol,
                symbol_exists: state.symbol_exists,
                rate_limited: state.rate_limited,
            });
        }

        Ok(self.assemble(symbol, state, now).await)
    }

    async fn run_step(&self, symbol: &str, step: &Step, state: &mut CascadeState) {
        debug!("{}: step {}", symbol, step.source);

        let result = match step.fetch {
            Fetch::Summary(modules) => self
                .provider
                .fetch_comprehensive(symbol, modules)
                .await
                .map(|raw| extract_comprehensive(&raw)),
            Fetch::Quote => self
                .provider
                .fetch_quote(symbol)
                .await
                .map(|raw| extract_quote(&raw)),
            Fetch::VerifySymbol => {
                match self.provider.verify_symbol_exists(symbol).await {
                    Ok(exists) => {
                        state.symbol_exists = Some(exists);
                        if exists {
                            state.sources.push(step.source);
                        }
                        info!("{}: symbol exists = {} but no market data was returned", symbol, exists);
                    }
                    Err(e) => {
                        warn!("Failed to verify symbol {}: {:?}", symbol, e);
                        state.failed(step.source, &e);
                    }
                }
                return;
            }
        };

        match result {
            Ok(extracted) => {
                let extracted = match step.keep {
                    Some(keep) => extracted.only(keep),
                    None => extracted,
                };
                let filled = state.record.merge_into(extracted);
                debug!("{}: {} filled {} fields", symbol, step.source, filled);
                state.succeeded(step.source);
            }
            Err(e) => {
                warn!("Failed to fetch {} for {}: {:?}", step.source, symbol, e);
                state.failed(step.source, &e);
            }
        }
    }

    async fn assemble(&self, symbol: String, state: CascadeState, now: DateTime<Utc>) -> TickerSnapshot {
        let CascadeState {
            mut record,
            sources,
            symbol_exists,
            ..
        } = state;

        let short_ratio = pct_float_short(record.int(Field::FloatShares), record.int(Field::ShortInterestShares));
        record.fill_float(Field::PctFloatShort, short_ratio);

        let runway = cash_runway_months(record.int(Field::TotalCash), record.int(Field::FreeCashFlow));
        let dilution = dilution_yoy(&self.provider, &symbol, record.int(Field::SharesOutstanding), &self.config).await;
        let split = detect_last_reverse_split(&symbol);

        let current_price = price_estimate(record.int(Field::MarketCap), record.int(Field::SharesOutstanding))
            .or_else(|| record.float(Field::RegularMarketPrice));
        let insider =
            fetch_insider_aggregate(&self.provider, &symbol, current_price, now.date_naive(), &self.config).await;

        let quality = assess_quality(&record, &sources);
        info!(
            "{}: data quality {:?} from {} sources",
            symbol,
            quality.quality,
            sources.len()
        );

        let flags = generate_flags(&FlagInputs {
            float_shares: record.int(Field::FloatShares),
            pct_float_short: record.float(Field::PctFloatShort),
            reverse_split_date: split.date,
            cash_runway_months: runway,
            dilution_yoy: dilution,
            insider: insider.clone(),
            market_cap: record.int(Field::MarketCap),
        });

        let text = |field: Field| record.text(field).map(str::to_string);

        TickerSnapshot {
            ticker: symbol,
            float_shares: record.int(Field::FloatShares),
            short_float_shares: record.int(Field::ShortInterestShares),
            pct_float_short: record.float(Field::PctFloatShort),
            institutional_ownership: record.float(Field::InstitutionalOwnership),
            last_reverse_split_date: split.date,
            reverse_split_ratio: split.ratio,
            sector: text(Field::Sector),
            industry: text(Field::Industry),
            company_name: text(Field::CompanyName),
            company_description: text(Field::Description),
            market_cap: record.int(Field::MarketCap),
            total_cash: record.int(Field::TotalCash),
            free_cash_flow_ttm: record.int(Field::FreeCashFlow),
            cash_runway_months: runway,
            shares_outstanding: record.int(Field::SharesOutstanding),
            dilution_yoy: dilution,
            insider_buy_net_90d: insider.as_ref().map(|i| i.net_buying),
            insider_transaction_data: insider,
            flags,
            data_quality: quality.quality,
            data_quality_message: quality.message,
            sources,
            symbol_verified: symbol_exists,
            last_updated: now,

            regular_market_price: record.float(Field::RegularMarketPrice),
            previous_close: record.float(Field::PreviousClose),
            day_high: record.float(Field::DayHigh),
            day_low: record.float(Field::DayLow),
            fifty_two_week_high: record.float(Field::FiftyTwoWeekHigh),
            fifty_two_week_low: record.float(Field::FiftyTwoWeekLow),
            volume: record.int(Field::Volume),
            average_volume: record.int(Field::AverageVolume),

            target_high_price: record.float(Field::TargetHighPrice),
            target_low_price: record.float(Field::TargetLowPrice),
            target_mean_price: record.float(Field::TargetMeanPrice),
            recommendation_mean: record.float(Field::RecommendationMean),
            number_of_analyst_opinions: record.int(Field::NumberOfAnalystOpinions),

            ipo_date: record.date(Field::IpoDate),
            next_earnings_date: record.date(Field::NextEarningsDate),
            ex_dividend_date: record.date(Field::ExDividendDate),
            earnings_average: record.float(Field::EarningsAverage),
            earnings_low: record.float(Field::EarningsLow),
            earnings_high: record.float(Field::EarningsHigh),
            revenue_average: record.int(Field::RevenueAverage),
            revenue_low: record.int(Field::RevenueLow),
            revenue_high: record.int(Field::RevenueHigh),

            currency: text(Field::Currency),
            exchange: text(Field::Exchange),
        }
    }
}
