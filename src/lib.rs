//! # Commodity Price Reconciler
//!
//! Turns internal purchase records and vendor market quotes into comparable
//! monthly price series for the commodity dashboard.
//!
//! ## Core Concepts
//!
//! - **Ledger entries**: what we actually paid, in whatever unit and currency
//!   the invoice used (per kilogram, per can, per bag, per barrel)
//! - **Market quotes**: vendor prices in exchange units (cents per bushel,
//!   dollars per tonne, cents per pound)
//! - **Common unit**: each commodity has one target unit and currency that both
//!   sides are converted into using a fixed [`ConversionTable`]
//! - **Month keys**: every date spelling is reduced to `YYYY-MM` and values are
//!   averaged per month
//! - **Reconciliation**: ledger months are paired with the market month of the
//!   same key to get a difference and a ratio
//! - **Provenance**: when the vendor is unreachable the market side is filled
//!   with placeholder quotes and the report says so
//!
//! ## Example
//!
//! ```rust,ignore
//! use commodity_price_reconciler::*;
//!
//! let config = PipelineConfig::for_commodity(CommodityId::Wheat).with_reference_year(2025);
//! let ledger = vec![RawLedgerEntry::new("2025-01-04", 7.12, Some(Currency::Ghs))];
//! let market = MarketFeed::Live(vec![RawMarketQuote::new("2025-01-02", 550.0)]);
//!
//! let report = process_commodity(&config, &ledger, &market).unwrap();
//! assert_eq!(report.records[0].month_key.to_string(), "2025-01");
//! ```

pub mod aggregation;
pub mod config;
pub mod conversion;
pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod month_key;
pub mod reconcile;
pub mod schema;
pub mod synthetic;
pub mod window;

#[cfg(feature = "vendor")]
pub mod vendor;

pub use aggregation::{AggregationStats, Aggregator, PricePoint};
pub use config::PipelineConfig;
pub use conversion::{
    round_to, CommonUnit, ConversionPipeline, ConversionTable, DisplayFormat, ExchangeRates,
    QuantityBasis, SideConversion,
};
pub use error::{CommodityPriceError, Result};
pub use ingestion::{parse_delimited_quotes, parse_results_json, DelimitedLayout};
pub use ledger::LedgerBook;
pub use month_key::{normalize_month_key, MonthKey, MonthKeyParser};
pub use reconcile::reconcile;
pub use schema::*;
pub use synthetic::{MarketFeed, SyntheticQuoteGenerator};
pub use window::{in_window, RecencyWindow};

use log::{debug, info, warn};

pub struct CommodityPriceProcessor;

impl CommodityPriceProcessor {
    pub fn process(
        config: &PipelineConfig,
        ledger: &[RawLedgerEntry],
        market: &MarketFeed,
    ) -> Result<ComparisonReport> {
        config.validate()?;

        let commodity = config.commodity;
        let pipeline = config
            .conversions
            .resolve(commodity, config.wheat_variant)?;
        let rates = &config.conversions.rates;
        let window = config.recency_window();
        let parser = config.month_key_parser();

        info!(
            "Processing {} with {} ledger entries (years {}..={})",
            commodity,
            ledger.len(),
            window.min_year(),
            window.max_year()
        );

        let ledger_aggregator = Aggregator::new(
            commodity,
            pipeline,
            rates,
            SourceKind::Ledger,
            window,
            parser,
        );
        let (ledger_series, ledger_stats) = ledger_aggregator.aggregate_with_stats(ledger);
        debug!("Ledger aggregation for {}: {:?}", commodity, ledger_stats);

        let market_aggregator = Aggregator::new(
            commodity,
            pipeline,
            rates,
            SourceKind::Market,
            window,
            parser,
        );
        let provenance = market.provenance();
        let market_series = match market {
            MarketFeed::Live(quotes) => {
                let (series, stats) = market_aggregator.aggregate_with_stats(quotes);
                debug!("Market aggregation for {}: {:?}", commodity, stats);
                series
            }
            MarketFeed::Unavailable { reason } => {
                warn!(
                    "Market data for {} unavailable ({}); using synthetic quotes",
                    commodity, reason
                );
                let months: Vec<MonthKey> =
                    ledger_series.iter().map(|agg| agg.month_key).collect();
                let generator = SyntheticQuoteGenerator::new(
                    pipeline.synthetic_reference,
                    config.synthetic_noise_factor,
                )?;
                let quotes = generator.generate(&months, config.synthetic_seed);
                market_aggregator.aggregate(&quotes)
            }
        };

        let records = reconcile(&ledger_series, &market_series, pipeline.decimals);

        info!(
            "{}: {} ledger months, {} market months, {} comparisons ({:?})",
            commodity,
            ledger_series.len(),
            market_series.len(),
            records.len(),
            provenance
        );

        Ok(ComparisonReport {
            commodity,
            unit_label: pipeline.unit_label.clone(),
            decimals: pipeline.decimals,
            provenance,
            ledger_series,
            market_series,
            records,
        })
    }

    pub fn process_book(
        config: &PipelineConfig,
        book: &LedgerBook,
        market: &MarketFeed,
    ) -> Result<ComparisonReport> {
        Self::process(config, book.entries(config.commodity), market)
    }
}

pub fn process_commodity(
    config: &PipelineConfig,
    ledger: &[RawLedgerEntry],
    market: &MarketFeed,
) -> Result<ComparisonReport> {
    CommodityPriceProcessor::process(config, ledger, market)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheat_config() -> PipelineConfig {
        PipelineConfig::for_commodity(CommodityId::Wheat).with_reference_year(2026)
    }

    #[test]
    fn test_end_to_end_single_entry() {
        let ledger = vec![RawLedgerEntry::new("2025-01-04", 7.12, Some(Currency::Ghs))];
        let market = MarketFeed::Live(vec![
            RawMarketQuote::new("2025-01-02", 550.0),
            RawMarketQuote::new("2025-01-09", 560.0),
        ]);

        let report = process_commodity(&wheat_config(), &ledger, &market).unwrap();
        assert_eq!(report.provenance, DataProvenance::Live);
        assert_eq!(report.unit_label, "NGN/kg");
        assert_eq!(report.decimals, 2);

        assert_eq!(report.ledger_series.len(), 1);
        assert_eq!(report.ledger_series[0].sample_count, 1);
        assert!((report.ledger_series[0].value - 1022.08).abs() < 1e-9);

        assert_eq!(report.market_series[0].sample_count, 2);
        let expected_market = 5.55 / 27.2155 * 1650.0;
        let market_value = report.records[0].market_value.unwrap();
        assert!((market_value - expected_market).abs() < 0.005);

        let record = &report.records[0];
        assert_eq!(record.month_key.to_string(), "2025-01");
        let difference = record.difference.unwrap();
        assert!((difference - (1022.08 - market_value)).abs() < 1e-6);
        assert!((record.ratio.unwrap() - 1022.08 / market_value).abs() < 1e-9);
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let book = LedgerBook::builtin();
        let market = MarketFeed::Live(vec![
            RawMarketQuote::new("2024-04-01", 570.0),
            RawMarketQuote::new("2025-01-15", 545.0),
        ]);

        let first = CommodityPriceProcessor::process_book(&wheat_config(), book, &market).unwrap();
        let second = CommodityPriceProcessor::process_book(&wheat_config(), book, &market).unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(first.ledger_series, second.ledger_series);
    }

    #[test]
    fn test_unavailable_market_is_labelled_synthetic() {
        let mut config = wheat_config();
        config.synthetic_seed = Some(42);
        let ledger = vec![
            RawLedgerEntry::new("2025-01-04", 7.12, None),
            RawLedgerEntry::new("2025-02-04", 7.2, None),
        ];
        let market = MarketFeed::unavailable("vendor returned 429");

        let report = process_commodity(&config, &ledger, &market).unwrap();
        assert_eq!(report.provenance, market.provenance());
        assert_eq!(report.provenance, DataProvenance::Synthetic);
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| r.market_value.is_some()));

        let again = process_commodity(&config, &ledger, &market).unwrap();
        assert_eq!(report.records, again.records);
    }

    #[test]
    fn test_empty_live_feed_keeps_nulls() {
        let ledger = vec![RawLedgerEntry::new("2025-01-04", 7.12, None)];
        let report =
            process_commodity(&wheat_config(), &ledger, &MarketFeed::Live(Vec::new())).unwrap();

        assert_eq!(report.provenance, DataProvenance::Live);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].market_value, None);
        assert_eq!(report.records[0].difference, None);
        assert_eq!(report.records[0].ratio, None);
    }

    #[test]
    fn test_missing_pipeline_is_fatal() {
        let mut config = PipelineConfig::for_commodity(CommodityId::Palm).with_reference_year(2026);
        config.conversions.pipelines.remove(&CommodityId::Palm);

        let result = process_commodity(&config, &[], &MarketFeed::Live(Vec::new()));
        assert!(matches!(
            result,
            Err(CommodityPriceError::MissingPipeline(CommodityId::Palm))
        ));
    }

    #[test]
    fn test_empty_ledger_gives_empty_report() {
        let market = MarketFeed::Live(vec![RawMarketQuote::new("2025-01-02", 550.0)]);
        let report = process_commodity(&wheat_config(), &[], &market).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.market_series.len(), 1);
    }
}
