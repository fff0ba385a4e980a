use crate::conversion::round_to;
use crate::month_key::MonthKey;
use crate::schema::{ComparisonRecord, MonthlyAggregate};
use log::debug;
use std::collections::BTreeMap;

/// Pairs ledger months with market months of the same key.
///
/// The output has exactly one record per distinct ledger month, oldest first.
/// Market months without a ledger counterpart are discarded. `difference` is
/// rounded to `decimals`; `ratio` is left unrounded.
pub fn reconcile(
    ledger: &[MonthlyAggregate],
    market: &[MonthlyAggregate],
    decimals: u32,
) -> Vec<ComparisonRecord> {
    let market_by_month: BTreeMap<MonthKey, f64> = market
        .iter()
        .map(|aggregate| (aggregate.month_key, aggregate.value))
        .collect();

    // Aggregated series are already unique per month; this guards callers
    // that hand in a hand-built series.
    let ledger_by_month: BTreeMap<MonthKey, f64> = ledger
        .iter()
        .map(|aggregate| (aggregate.month_key, aggregate.value))
        .collect();

    let dropped = market_by_month
        .keys()
        .filter(|key| !ledger_by_month.contains_key(key))
        .count();
    if dropped > 0 {
        debug!(
            "Reconciliation ignored {} market month(s) with no ledger purchases",
            dropped
        );
    }

    ledger_by_month
        .into_iter()
        .map(|(month_key, ledger_value)| {
            let market_value = market_by_month.get(&month_key).copied();
            compare(month_key, ledger_value, market_value, decimals)
        })
        .collect()
}

fn compare(
    month_key: MonthKey,
    ledger_value: f64,
    market_value: Option<f64>,
    decimals: u32,
) -> ComparisonRecord {
    let difference = market_value.map(|market| round_to(ledger_value - market, decimals));
    let ratio = market_value
        .filter(|market| *market != 0.0)
        .map(|market| ledger_value / market);

    ComparisonRecord {
        month_key,
        ledger_value: Some(ledger_value),
        market_value,
        difference,
        ratio,
    }
}
