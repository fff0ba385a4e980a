use crate::conversion::{round_to, ConversionPipeline, ConversionTable, ExchangeRates};
use crate::error::Result;
use crate::month_key::{MonthKey, MonthKeyParser};
use crate::schema::{
    CommodityId, Currency, MonthlyAggregate, RawLedgerEntry, RawMarketQuote, SourceKind,
};
use crate::window::RecencyWindow;
use log::debug;
use std::collections::BTreeMap;

/// A dated raw price that can be bucketed by month.
pub trait PricePoint {
    fn date(&self) -> &str;

    fn raw_value(&self) -> Option<f64>;

    /// Currency of the raw value, if the record names one.
    fn currency(&self) -> Option<Currency> {
        None
    }
}

impl PricePoint for RawLedgerEntry {
    fn date(&self) -> &str {
        &self.date
    }

    fn raw_value(&self) -> Option<f64> {
        self.amount
    }

    fn currency(&self) -> Option<Currency> {
        self.currency
    }
}

impl PricePoint for RawMarketQuote {
    fn date(&self) -> &str {
        &self.date
    }

    fn raw_value(&self) -> Option<f64> {
        self.raw_value
    }
}

impl PricePoint for (&str, f64) {
    fn date(&self) -> &str {
        self.0
    }

    fn raw_value(&self) -> Option<f64> {
        Some(self.1)
    }
}

/// Counts of what happened to each input record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub input: usize,
    pub unparseable_date: usize,
    pub out_of_window: usize,
    pub unconvertible: usize,
    pub kept: usize,
}

pub struct Aggregator<'a> {
    commodity: CommodityId,
    pipeline: &'a ConversionPipeline,
    rates: &'a ExchangeRates,
    source: SourceKind,
    window: RecencyWindow,
    parser: MonthKeyParser,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        commodity: CommodityId,
        pipeline: &'a ConversionPipeline,
        rates: &'a ExchangeRates,
        source: SourceKind,
        window: RecencyWindow,
        parser: MonthKeyParser,
    ) -> Self {
        Self {
            commodity,
            pipeline,
            rates,
            source,
            window,
            parser,
        }
    }

    pub fn from_table(
        table: &'a ConversionTable,
        commodity: CommodityId,
        source: SourceKind,
        window: RecencyWindow,
        parser: MonthKeyParser,
    ) -> Result<Self> {
        let pipeline = table.pipeline(commodity)?;
        Ok(Self::new(
            commodity,
            pipeline,
            &table.rates,
            source,
            window,
            parser,
        ))
    }

    pub fn aggregate<P: PricePoint>(&self, records: &[P]) -> Vec<MonthlyAggregate> {
        self.aggregate_with_stats(records).0
    }

    /// Buckets records by month and averages each bucket. Records with an
    /// unreadable date, a year outside the window or an unconvertible value
    /// are dropped before they can touch an average.
    pub fn aggregate_with_stats<P: PricePoint>(
        &self,
        records: &[P],
    ) -> (Vec<MonthlyAggregate>, AggregationStats) {
        let mut stats = AggregationStats {
            input: records.len(),
            ..Default::default()
        };
        let mut buckets: BTreeMap<MonthKey, Vec<f64>> = BTreeMap::new();

        for record in records {
            let Some(key) = self.parser.parse(record.date()) else {
                debug!(
                    "{} {:?}: dropping record with unparseable date '{}'",
                    self.commodity,
                    self.source,
                    record.date()
                );
                stats.unparseable_date += 1;
                continue;
            };

            if !self.window.contains(&key) {
                debug!(
                    "{} {:?}: dropping {} outside {}..={}",
                    self.commodity,
                    self.source,
                    key,
                    self.window.min_year(),
                    self.window.max_year()
                );
                stats.out_of_window += 1;
                continue;
            }

            let converted = self.pipeline.to_common_unit(
                self.rates,
                record.raw_value(),
                self.source,
                record.currency(),
            );
            let Some(value) = converted else {
                debug!(
                    "{} {:?}: dropping {} with unusable value {:?}",
                    self.commodity,
                    self.source,
                    key,
                    record.raw_value()
                );
                stats.unconvertible += 1;
                continue;
            };

            buckets.entry(key).or_default().push(value);
            stats.kept += 1;
        }

        let decimals = self.pipeline.decimals;
        let series = buckets
            .into_iter()
            .map(|(month_key, mut values)| {
                // Sorting first makes the sum independent of input order.
                values.sort_by(f64::total_cmp);
                let sample_count = values.len();
                let mean = values.iter().sum::<f64>() / sample_count as f64;
                MonthlyAggregate {
                    month_key,
                    value: round_to(mean, decimals),
                    sample_count,
                }
            })
            .collect();

        (series, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_wheat<P: PricePoint>(source: SourceKind, records: &[P]) -> Vec<MonthlyAggregate> {
        let table = ConversionTable::builtin();
        let aggregator = Aggregator::from_table(
            &table,
            CommodityId::Wheat,
            source,
            RecencyWindow::years_back(2026, 5),
            MonthKeyParser::new(2026),
        )
        .unwrap();
        aggregator.aggregate(records)
    }

    #[test]
    fn test_single_ledger_entry() {
        let entries = vec![RawLedgerEntry::new("2025-01-04", 7.12, Some(Currency::Ghs))];
        let series = aggregate_wheat(SourceKind::Ledger, &entries);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].month_key.to_string(), "2025-01");
        assert_eq!(series[0].sample_count, 1);
        assert!((series[0].value - 1022.08).abs() < 1e-9);
    }

    #[test]
    fn test_same_month_is_averaged_not_replaced() {
        let entries = vec![
            RawLedgerEntry::new("2025-02-03", 1000.0, Some(Currency::Ngn)),
            RawLedgerEntry::new("Feb-2025", 2000.0, Some(Currency::Ngn)),
            RawLedgerEntry::new("2/27/2025", 4000.0, Some(Currency::Ngn)),
        ];
        let series = aggregate_wheat(SourceKind::Ledger, &entries);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].sample_count, 3);
        assert!((series[0].value - 2333.33).abs() < 1e-9);
    }

    #[test]
    fn test_output_sorted_by_month() {
        let quotes = vec![
            RawMarketQuote::new("2025-03-01", 550.0),
            RawMarketQuote::new("2024-11-01", 560.0),
            RawMarketQuote::new("Jan-25", 540.0),
        ];
        let series = aggregate_wheat(SourceKind::Market, &quotes);
        let keys: Vec<String> = series.iter().map(|a| a.month_key.to_string()).collect();
        assert_eq!(keys, vec!["2024-11", "2025-01", "2025-03"]);
    }

    #[test]
    fn test_bad_records_are_dropped_and_counted() {
        let table = ConversionTable::builtin();
        let aggregator = Aggregator::from_table(
            &table,
            CommodityId::Wheat,
            SourceKind::Ledger,
            RecencyWindow::years_back(2026, 5),
            MonthKeyParser::new(2026),
        )
        .unwrap();

        let entries = vec![
            RawLedgerEntry::new("garbage", 7.0, None),
            RawLedgerEntry::new("2019-05-01", 7.0, None),
            RawLedgerEntry {
                date: "2025-05-01".to_string(),
                amount: None,
                currency: None,
            },
            RawLedgerEntry::new("2025-05-02", 8.0, None),
        ];

        let (series, stats) = aggregator.aggregate_with_stats(&entries);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].sample_count, 1);
        assert_eq!(
            stats,
            AggregationStats {
                input: 4,
                unparseable_date: 1,
                out_of_window: 1,
                unconvertible: 1,
                kept: 1,
            }
        );
    }

    #[test]
    fn test_window_boundary_years() {
        let records = [("2021-01-15", 550.0), ("2020-12-15", 550.0)];
        let series = aggregate_wheat(SourceKind::Market, &records);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].month_key.year(), 2021);
    }

    #[test]
    fn test_order_independence() {
        let forward = vec![
            RawMarketQuote::new("2025-01-02", 551.25),
            RawMarketQuote::new("2025-01-09", 548.5),
            RawMarketQuote::new("2025-01-16", 560.75),
            RawMarketQuote::new("2025-02-03", 530.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(2);

        let expected = aggregate_wheat(SourceKind::Market, &forward);
        assert_eq!(aggregate_wheat(SourceKind::Market, &reversed), expected);
        assert_eq!(aggregate_wheat(SourceKind::Market, &rotated), expected);
    }

    #[test]
    fn test_empty_input_gives_empty_series() {
        let records: Vec<RawMarketQuote> = Vec::new();
        assert!(aggregate_wheat(SourceKind::Market, &records).is_empty());
    }
}
