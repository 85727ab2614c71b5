//! `markets` command handler: tabulated view of the archive.

use chrono::DateTime;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::archive::{create_pool, run_migrations, MarketArchive};
use crate::config::Config;
use crate::domain::Market;
use crate::error::{Error, Result};

#[derive(Debug, Tabled, Serialize)]
struct MarketLine {
    #[tabled(rename = "MARKET")]
    key: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "RESULT")]
    result: String,
    #[tabled(rename = "POOL UP")]
    total_up: u64,
    #[tabled(rename = "POOL DOWN")]
    total_down: u64,
    #[tabled(rename = "START PX")]
    start_price: String,
    #[tabled(rename = "END PX")]
    end_price: String,
}

impl From<&Market> for MarketLine {
    fn from(market: &Market) -> Self {
        Self {
            key: market.key().to_string(),
            start: format_ts(market.start_ts()),
            status: market.status().to_string(),
            result: market.result().to_string(),
            total_up: market.total_up(),
            total_down: market.total_down(),
            start_price: market.start_price().to_string(),
            end_price: market
                .end_price()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".into()),
        }
    }
}

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// List every archived market, newest epoch first.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    if config.database.path.is_empty() {
        return Err(Error::Database(
            "no archive configured (database.path is empty)".into(),
        ));
    }

    let pool = create_pool(&config.database.path)?;
    run_migrations(&pool)?;
    let snapshot = MarketArchive::new(pool).load()?;

    let lines: Vec<MarketLine> = snapshot.markets.iter().map(MarketLine::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if lines.is_empty() {
        println!("no markets archived yet");
        return Ok(());
    }

    let table = Table::new(lines).with(Style::sharp()).to_string();
    println!("{table}");
    Ok(())
}
