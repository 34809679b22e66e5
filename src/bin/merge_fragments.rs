use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use subscription_sync::utils::logger;
use subscription_sync::{
    apply_commerce_facts, price_sheet_csv, CommerceFact, FragmentMerger, PeriodUnit,
};

#[derive(Parser)]
#[command(name = "merge-fragments")]
#[command(about = "Merge paywall fragment files offline and optionally price them")]
struct Args {
    /// Fragment files, merged in the given order
    #[arg(required = true)]
    fragments: Vec<PathBuf>,

    /// JSON file with store facts: [{"product_id", "price", "unit", "value"}]
    #[arg(short, long)]
    facts: Option<PathBuf>,

    /// Print a CSV price sheet instead of JSON
    #[arg(long)]
    csv: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct FactRecord {
    product_id: String,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    value: Option<u32>,
}

impl From<FactRecord> for CommerceFact {
    fn from(record: FactRecord) -> Self {
        let unit = record.unit.as_deref().and_then(PeriodUnit::parse);
        CommerceFact::new(record.product_id, record.price, unit, record.value.unwrap_or(1))
    }
}

/// 檔案內容可以是單一 fragment 或 fragment 陣列；不是 JSON 的內容原樣交給 decoder 處理
fn read_fragments(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fragment file {}", path.display()))?;

    Ok(match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(fragments)) => fragments,
        Ok(fragment) => vec![fragment],
        Err(_) => vec![Value::String(text)],
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose, None);

    let mut merger = FragmentMerger::new();
    for path in &args.fragments {
        for (index, fragment) in read_fragments(path)?.iter().enumerate() {
            if let Err(e) = merger.push_fragment(fragment) {
                tracing::warn!(
                    "⚠️ Dropping fragment #{} of {}: {}",
                    index,
                    path.display(),
                    e
                );
            }
        }
    }
    tracing::info!(
        "🧩 Merged {} fragment(s), dropped {}",
        merger.accepted(),
        merger.dropped()
    );
    let mut response = merger.finish();

    if let Some(path) = &args.facts {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read facts file {}", path.display()))?;
        let records: Vec<FactRecord> =
            serde_json::from_str(&text).context("facts file must be a JSON array")?;
        let facts: Vec<CommerceFact> = records.into_iter().map(CommerceFact::from).collect();

        let report = apply_commerce_facts(&mut response, &facts);
        tracing::info!("💰 Priced {} package(s)", report.updated_packages);
        for id in &report.unmatched_facts {
            tracing::warn!("⚠️ No package for product '{}'", id);
        }
    }

    if args.csv {
        print!("{}", price_sheet_csv(&response)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    Ok(())
}
