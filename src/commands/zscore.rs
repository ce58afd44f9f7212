use anyhow::{Context, Result};

use zeitgeist::analytics::z_score_anomalies;

/// Parse `1, 2.5,3` into numbers
pub fn parse_values(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid number: {s}"))
        })
        .collect()
}

pub fn zscore(values: &str, threshold: f64) -> Result<()> {
    let values = parse_values(values)?;
    let anomalies = z_score_anomalies(&values, threshold);

    println!("{}", serde_json::to_string(&anomalies)?);
    Ok(())
}
