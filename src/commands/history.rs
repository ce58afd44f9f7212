use anyhow::Result;

use zeitgeist::trends::TrendManager;

pub async fn history(manager: &TrendManager, limit: usize) -> Result<()> {
    let summaries = manager.history(limit).await?;

    if summaries.is_empty() {
        println!("No trend snapshots stored.");
        println!("Run 'zeitgeist detect' first.");
        return Ok(());
    }

    println!("Recent trend snapshots");
    println!("======================");
    for summary in &summaries {
        print!(
            "{}  {}  trends: {:>3}  spikes: {:>3}",
            summary.id,
            summary.timestamp.format("%Y-%m-%d %H:%M:%S"),
            summary.trend_count,
            summary.spike_count
        );
        match &summary.error {
            Some(error) => println!("  ({error})"),
            None => println!(),
        }
    }
    Ok(())
}

pub async fn prune(manager: &TrendManager, keep: usize) -> Result<()> {
    let removed = manager.prune(keep).await?;
    println!("Removed {removed} snapshot(s), kept at most {keep}.");
    Ok(())
}
