use commodity_price_reconciler::*;
use std::error::Error;

fn print_report(report: &ComparisonReport) {
    let decimals = report.decimals as usize;
    let cell = |value: Option<f64>, decimals: usize| {
        value
            .map(|v| format!("{:>12.*}", decimals, v))
            .unwrap_or_else(|| format!("{:>12}", "-"))
    };

    println!(
        "\n📦 {} ({}, market data: {:?})",
        report.commodity, report.unit_label, report.provenance
    );
    println!(
        "{:<8} {:>12} {:>12} {:>12} {:>12}",
        "Month", "Ledger", "Market", "Difference", "Ratio"
    );
    println!("{}", "-".repeat(60));

    for record in &report.records {
        println!(
            "{:<8} {} {} {} {}",
            record.month_key.to_string(),
            cell(record.ledger_value, decimals),
            cell(record.market_value, decimals),
            cell(record.difference, decimals),
            cell(record.ratio, 3),
        );
    }
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    // An optional JSON config path overrides the built-in conversion table.
    let base = match std::env::args().nth(1) {
        Some(path) => {
            println!("📄 Loading config from {}", path);
            PipelineConfig::from_json_file(&path)?
        }
        None => PipelineConfig::default(),
    };

    println!("📊 Commodity price dashboard feed");
    let window = base.recency_window();
    println!(
        "   Accepting years {}..={}",
        window.min_year(),
        window.max_year()
    );

    let book = LedgerBook::builtin();
    for commodity in CommodityId::ALL {
        let mut config = base.clone();
        config.commodity = commodity;
        if config.synthetic_seed.is_none() {
            config.synthetic_seed = Some(2024);
        }

        // No vendor access here, so every market side is placeholder data.
        let market = MarketFeed::unavailable("vendor client not configured");
        let report = CommodityPriceProcessor::process_book(&config, book, &market)?;

        if report.is_empty() {
            println!("\n⚠️  {} has no ledger months in range", commodity);
            continue;
        }
        print_report(&report);
    }

    println!("\n✅ Done");
    Ok(())
}
