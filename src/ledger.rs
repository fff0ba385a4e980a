use crate::error::Result;
use crate::schema::{CommodityId, Currency, RawLedgerEntry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Purchase history keyed by commodity. Loaded once and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct LedgerBook {
    pub entries: BTreeMap<CommodityId, Vec<RawLedgerEntry>>,
}

impl LedgerBook {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The purchase table shipped with the dashboard.
    pub fn builtin() -> &'static LedgerBook {
        static BOOK: OnceLock<LedgerBook> = OnceLock::new();
        BOOK.get_or_init(builtin_book)
    }

    /// Entries for `commodity`, or an empty slice when none were recorded.
    pub fn entries(&self, commodity: CommodityId) -> &[RawLedgerEntry] {
        self.entries
            .get(&commodity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn purchases(currency: Option<Currency>, rows: &[(&str, f64)]) -> Vec<RawLedgerEntry> {
    rows.iter()
        .map(|(date, amount)| RawLedgerEntry::new(*date, *amount, currency))
        .collect()
}

fn builtin_book() -> LedgerBook {
    let mut book = BTreeMap::new();

    // GHS per kilogram, except the naira-invoiced Lagos deliveries.
    let mut wheat = purchases(
        Some(Currency::Ghs),
        &[
            ("Apr-24", 6.85),
            ("May-24", 6.92),
            ("2024-07-11", 7.05),
            ("2024-09-02", 7.18),
            ("2024-11-20", 7.02),
            ("2025-01-04", 7.12),
            ("2025-01-22", 7.3),
            ("3/14/2025", 7.41),
            ("6/17/2025", 7.26),
        ],
    );
    wheat.extend(purchases(
        Some(Currency::Ngn),
        &[("2024-08-15", 1210.0), ("2025-02-10", 1185.0)],
    ));
    book.insert(CommodityId::Wheat, wheat);

    // GHS per 25 litre can.
    book.insert(
        CommodityId::Palm,
        purchases(
            None,
            &[
                ("Mar-24", 610.0),
                ("Jun-24", 645.0),
                ("Sep-24", 670.0),
                ("Dec-24", 700.0),
                ("Mar-25", 715.0),
                ("Jun-25", 690.0),
            ],
        ),
    );

    // USD per barrel.
    book.insert(
        CommodityId::CrudePalm,
        purchases(
            Some(Currency::Usd),
            &[
                ("2024-05-08", 131.5),
                ("2024-08-19", 136.2),
                ("2024-12-03", 158.4),
                ("2025-03-27", 149.9),
                ("2025-06-05", 141.0),
            ],
        ),
    );

    // NGN per 50 kg bag.
    book.insert(
        CommodityId::Sugar,
        purchases(
            Some(Currency::Ngn),
            &[
                ("Jan-2024", 62_000.0),
                ("Apr-2024", 71_500.0),
                ("Jul-2024", 78_000.0),
                ("Oct-2024", 83_000.0),
                ("Jan-2025", 86_500.0),
                ("Apr-2025", 84_000.0),
            ],
        ),
    );

    // USD per empty can.
    book.insert(
        CommodityId::Aluminum,
        purchases(
            Some(Currency::Usd),
            &[
                ("2024-06-30", 0.0385),
                ("2024-09-30", 0.0392),
                ("2024-12-31", 0.0401),
                ("2025-03-31", 0.0418),
                ("2025-06-30", 0.0409),
            ],
        ),
    );

    LedgerBook { entries: book }
}
