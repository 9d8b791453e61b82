//! Seed data script - populates the database with realistic dairy sales
//!
//! Run with: cargo run --bin seed-data -- --days 180
//!
//! This creates daily sales for three SKUs:
//! - MILK-1L: steady volume, busier weekends
//! - CURD-500G: rises through the summer months
//! - PANEER-200G: spikes around the autumn festival season
//!
//! Each day is split into one to three transactions, and roughly one day in a
//! hundred records no sales at all (stock-out), so forecasts exercise the
//! same-day summing and zero-fill paths.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

use dairy_forecast::{config, db, ml::Observation, repositories::DemandObservationRepository};

#[derive(Parser)]
#[command(name = "seed-data", about = "Generate demo dairy sales history")]
struct Args {
    /// Number of days of history to generate
    #[arg(long, default_value_t = 180)]
    days: u32,
    /// Last day of generated history (defaults to today)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// RNG seed, for reproducible data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Sku {
    id: &'static str,
    base_daily: f64,
}

const CATALOG: [Sku; 3] = [
    Sku {
        id: "MILK-1L",
        base_daily: 120.0,
    },
    Sku {
        id: "CURD-500G",
        base_daily: 45.0,
    },
    Sku {
        id: "PANEER-200G",
        base_daily: 18.0,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::load_config()?;
    config::init_tracing(config.log_level(), config.log_json);

    info!("=== Dairy Forecast Seed Data ===");
    info!("Connecting to database: {}", config.database_url());
    let pool = Arc::new(db::establish_connection_from_app_config(&config).await?);
    db::run_migrations(&pool).await?;
    let repository = DemandObservationRepository::new(pool.clone());

    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = end - Duration::days(i64::from(args.days.max(1)) - 1);
    let mut rng = StdRng::seed_from_u64(args.seed);

    for sku in &CATALOG {
        let observations = generate_sales(sku, start, end, &mut rng);
        let inserted = repository.insert_many(&observations).await?;
        info!(
            "  {}: {} transactions from {} to {}",
            sku.id, inserted, start, end
        );
    }

    drop(repository);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        db::close_pool(pool).await?;
    }

    info!("=== Seed Data Complete ===");
    info!("Try: cargo run --bin dairy-forecast -- forecast --sku MILK-1L --days 14");

    Ok(())
}

fn seasonal_multiplier(sku: &Sku, date: NaiveDate) -> f64 {
    let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    let mut multiplier = if weekend { 1.25 } else { 1.0 };

    match sku.id {
        "CURD-500G" if (4..=6).contains(&date.month()) => multiplier *= 1.3,
        "MILK-1L" if (4..=6).contains(&date.month()) => multiplier *= 0.95,
        "PANEER-200G" if is_festival_season(date) => multiplier *= 1.8,
        _ => {}
    }

    multiplier
}

fn is_festival_season(date: NaiveDate) -> bool {
    (date.month() == 10 && date.day() >= 20) || (date.month() == 11 && date.day() <= 5)
}

fn generate_sales(sku: &Sku, start: NaiveDate, end: NaiveDate, rng: &mut StdRng) -> Vec<Observation> {
    let mut observations = Vec::new();
    let mut date = start;

    while date <= end {
        if rng.gen_bool(0.01) {
            date += Duration::days(1);
            continue;
        }

        let noise = rng.gen_range(0.9..1.1);
        let total = (sku.base_daily * seasonal_multiplier(sku, date) * noise).round();

        let transactions = rng.gen_range(1..=3);
        let mut remaining = total;
        for i in 0..transactions {
            let quantity = if i + 1 == transactions {
                remaining
            } else {
                (remaining * rng.gen_range(0.2..0.6)).round()
            };
            remaining -= quantity;
            observations.push(Observation::new(sku.id, date, quantity));
        }

        date += Duration::days(1);
    }

    observations
}
