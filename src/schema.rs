use crate::error::CommodityPriceError;
use crate::month_key::MonthKey;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CommodityId {
    #[schemars(description = "Milling wheat. Compared in NGN per kilogram.")]
    Wheat,

    #[schemars(description = "Refined palm oil bought by the can. Compared in GHS per kilogram.")]
    Palm,

    #[schemars(description = "Crude palm oil bought by the barrel. Compared in USD per kilogram.")]
    CrudePalm,

    #[schemars(description = "Sugar bought by the 50 kg bag. Compared in NGN per kilogram.")]
    Sugar,

    #[schemars(description = "Aluminum beverage cans. Compared in USD per can.")]
    Aluminum,
}

impl CommodityId {
    pub const ALL: [CommodityId; 5] = [
        CommodityId::Wheat,
        CommodityId::Palm,
        CommodityId::CrudePalm,
        CommodityId::Sugar,
        CommodityId::Aluminum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommodityId::Wheat => "wheat",
            CommodityId::Palm => "palm",
            CommodityId::CrudePalm => "crude_palm",
            CommodityId::Sugar => "sugar",
            CommodityId::Aluminum => "aluminum",
        }
    }
}

impl fmt::Display for CommodityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommodityId {
    type Err = CommodityPriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        CommodityId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| CommodityPriceError::UnknownCommodity(s.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[schemars(description = "United States dollar")]
    Usd,
    #[schemars(description = "Ghanaian cedi")]
    Ghs,
    #[schemars(description = "Nigerian naira")]
    Ngn,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => f.write_str("USD"),
            Currency::Ghs => f.write_str("GHS"),
            Currency::Ngn => f.write_str("NGN"),
        }
    }
}

/// Which side of the comparison a raw value came from. Each side has its own
/// conversion direction for the same commodity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Ledger,
    Market,
}

/// Wheat grade selector. Only milling wheat has a conversion pipeline.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum WheatVariant {
    #[default]
    #[schemars(description = "Milling wheat priced against the CBOT soft red winter contract.")]
    Milling,
}

/// One internal purchase transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawLedgerEntry {
    #[schemars(
        description = "Purchase date in any supported form: YYYY-MM, Apr-24, YYYY-MM-DD, M/D/YYYY."
    )]
    pub date: String,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(
        with = "Option<f64>",
        description = "Price paid in the commodity's ledger unit. Numeric strings are accepted."
    )]
    pub amount: Option<f64>,

    #[serde(default)]
    #[schemars(
        description = "Currency of the amount. Falls back to the commodity's ledger currency when absent."
    )]
    pub currency: Option<Currency>,
}

impl RawLedgerEntry {
    pub fn new(date: impl Into<String>, amount: f64, currency: Option<Currency>) -> Self {
        Self {
            date: date.into(),
            amount: Some(amount),
            currency,
        }
    }
}

/// One external market observation in vendor-native units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawMarketQuote {
    pub date: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(with = "Option<f64>")]
    pub raw_value: Option<f64>,
}

impl RawMarketQuote {
    pub fn new(date: impl Into<String>, raw_value: f64) -> Self {
        Self {
            date: date.into(),
            raw_value: Some(raw_value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month_key: MonthKey,
    /// Mean of the normalized values in this month, rounded to the
    /// commodity's display precision.
    pub value: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub month_key: MonthKey,
    pub ledger_value: Option<f64>,
    pub market_value: Option<f64>,
    pub difference: Option<f64>,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvenance {
    /// Quotes came from the market data vendor.
    Live,
    /// The vendor was unavailable and quotes were generated around a
    /// reference price.
    Synthetic,
}

/// Everything a chart needs for one commodity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub commodity: CommodityId,
    pub unit_label: String,
    pub decimals: u32,
    pub provenance: DataProvenance,
    pub ledger_series: Vec<MonthlyAggregate>,
    pub market_series: Vec<MonthlyAggregate>,
    pub records: Vec<ComparisonRecord>,
}

impl ComparisonReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads a price that may arrive as a JSON number, a numeric string or null.
/// Anything else becomes a missing value rather than a deserialization error.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(amount_from_value))
}

pub(crate) fn amount_from_value(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_amount(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commodity_from_str() {
        assert_eq!("wheat".parse::<CommodityId>().unwrap(), CommodityId::Wheat);
        assert_eq!(
            " Crude_Palm ".parse::<CommodityId>().unwrap(),
            CommodityId::CrudePalm
        );
        let err = "corn".parse::<CommodityId>().unwrap_err();
        assert!(matches!(err, CommodityPriceError::UnknownCommodity(ref s) if s == "corn"));
    }

    #[test]
    fn test_ledger_entry_lenient_amounts() {
        let json = r#"[
            {"date": "2025-01-04", "amount": 7.12, "currency": "GHS"},
            {"date": "2025-01-05", "amount": "1,250.50"},
            {"date": "2025-01-06", "amount": null},
            {"date": "2025-01-07", "amount": "n/a"},
            {"date": "2025-01-08"}
        ]"#;

        let entries: Vec<RawLedgerEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].amount, Some(7.12));
        assert_eq!(entries[0].currency, Some(Currency::Ghs));
        assert_eq!(entries[1].amount, Some(1250.5));
        assert_eq!(entries[1].currency, None);
        assert_eq!(entries[2].amount, None);
        assert_eq!(entries[3].amount, None);
        assert_eq!(entries[4].amount, None);
    }

    #[test]
    fn test_identifiers_serialize_snake_case() {
        let json = serde_json::to_string(&CommodityId::CrudePalm).unwrap();
        assert_eq!(json, "\"crude_palm\"");
        let json = serde_json::to_string(&Currency::Ngn).unwrap();
        assert_eq!(json, "\"NGN\"");
    }
}
