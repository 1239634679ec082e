use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical snapshot field names shared by every extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    // Price & trading
    RegularMarketPrice,
    PreviousClose,
    DayHigh,
    DayLow,
    FiftyTwoWeekHigh,
    FiftyTwoWeekLow,
    Volume,
    AverageVolume,
    MarketCap,

    // Share structure & ownership
    FloatShares,
    ShortInterestShares,
    PctFloatShort,
    SharesOutstanding,
    InstitutionalOwnership,

    // Profile
    CompanyName,
    Sector,
    Industry,
    Description,
    Currency,
    Exchange,

    // Financials & analysts
    TotalCash,
    FreeCashFlow,
    TargetHighPrice,
    TargetLowPrice,
    TargetMeanPrice,
    RecommendationMean,
    NumberOfAnalystOpinions,

    // Calendar
    NextEarningsDate,
    ExDividendDate,
    IpoDate,
    EarningsAverage,
    EarningsLow,
    EarningsHigh,
    RevenueAverage,
    RevenueLow,
    RevenueHigh,
}

impl Field {
    /// Fields a lightweight quote is expected to fill.
    pub const TRADING: &'static [Field] = &[
        Field::RegularMarketPrice,
        Field::PreviousClose,
        Field::DayHigh,
        Field::DayLow,
        Field::Volume,
        Field::MarketCap,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Canonical fields gathered so far for one request.
///
/// Absent fields are simply not stored. Built by extractors and accumulated
/// by the cascade through [`PartialRecord::merge_into`]; one record is owned by
/// exactly one in-flight request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialRecord {
    fields: BTreeMap<Field, FieldValue>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn int(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    pub fn float(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn date(&self, field: Field) -> Option<NaiveDate> {
        self.get(field).and_then(FieldValue::as_date)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.fields.iter()
    }

    /// Store a value only when the field is still empty. Non-finite floats are
    /// refused. Returns whether the record changed.
    pub fn fill(&mut self, field: Field, value: Option<FieldValue>) -> bool {
        let Some(value) = value else { return false };
        if let FieldValue::Float(f) = value {
            if !f.is_finite() {
                return false;
            }
        }
        if self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, value);
        true
    }

    pub fn fill_int(&mut self, field: Field, value: Option<i64>) -> bool {
        self.fill(field, value.map(FieldValue::Int))
    }

    pub fn fill_float(&mut self, field: Field, value: Option<f64>) -> bool {
        self.fill(field, value.map(FieldValue::Float))
    }

    pub fn fill_text(&mut self, field: Field, value: Option<String>) -> bool {
        self.fill(field, value.map(FieldValue::Text))
    }

    pub fn fill_date(&mut self, field: Field, value: Option<NaiveDate>) -> bool {
        self.fill(field, value.map(FieldValue::Date))
    }

    /// Keep only the listed fields.
    pub fn only(mut self, keep: &[Field]) -> Self {
        self.fields.retain(|f, _| keep.contains(f));
        self
    }

    /// Non-destructive merge. A populated field is never overwritten, except
    /// the description, which takes a strictly longer candidate. Returns the
    /// number of fields that changed.
    pub fn merge_into(&mut self, extracted: PartialRecord) -> usize {
        let mut changed = 0;
        for (field, candidate) in extracted.fields {
            match self.fields.get(&field) {
                None => {
                    self.fields.insert(field, candidate);
                    changed += 1;
                }
                Some(FieldValue::Text(current)) if field == Field::Description => {
                    let longer = candidate
                        .as_str()
                        .is_some_and(|c| c.chars().count() > current.chars().count());
                    if longer {
                        self.fields.insert(field, candidate);
                        changed += 1;
                    }
                }
                Some(_) => {}
            }
        }
        changed
    }
}
