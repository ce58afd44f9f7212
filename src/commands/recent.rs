use anyhow::Result;
use std::time::Duration;

use zeitgeist::trends::TrendManager;

use super::detect::print_report;

pub async fn recent(manager: &TrendManager, ttl: Duration) -> Result<()> {
    let report = manager.get_recent_trends(ttl).await;
    print_report(&report)
}
