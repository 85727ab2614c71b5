//! `check-config` command handler.

use owo_colors::OwoColorize;

use crate::config::Config;

/// Print the effective configuration. Reaching this point means the file
/// already loaded and validated.
pub fn execute(config: &Config) {
    println!("{} configuration is valid", "ok".green().bold());
    println!("  feed:               {}", config.market.feed_id);
    println!("  fee:                {} bps", config.market.fee_bps);
    println!(
        "  minimum net stake:  {} lamports",
        config.market.min_bet_lamports
    );
    println!("  epoch:              {}s", config.market.epoch_seconds);
    println!("  oracle endpoint:    {}", config.oracle.endpoint);
    println!(
        "  staleness bound:    {}s",
        config.oracle.max_staleness_seconds
    );
    println!(
        "  poll interval:      {}s",
        config.orchestrator.poll_interval_seconds
    );
    if config.database.path.is_empty() {
        println!("  archive:            {}", "disabled".yellow());
    } else {
        println!("  archive:            {}", config.database.path);
    }
}
