use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zeitgeist::config::Config;
use zeitgeist::trends::options::window_hours;
use zeitgeist::trends::{DetectOptions, TrendManager};

mod commands;

#[derive(Parser)]
#[command(
    name = "zeitgeist",
    version,
    about = "Trend detection over timestamped content: topics, spikes and velocity",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true, default_value = "false")]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect trends in a JSON array of content items
    Detect {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Number of topics to request from the extractor
        #[arg(long)]
        num_topics: Option<usize>,

        /// Minimum documents per topic
        #[arg(long)]
        min_cluster_size: Option<usize>,

        /// Spike window in hours
        #[arg(long)]
        time_window_hours: Option<i64>,

        /// Velocity window in hours
        #[arg(long)]
        window_size_hours: Option<i64>,

        /// Spike threshold multiplier
        #[arg(long)]
        threshold: Option<f64>,

        /// Item field to group by
        #[arg(long)]
        group_by: Option<String>,
    },

    /// Show the cached or most recently stored report
    Recent {
        /// Cache freshness in seconds
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// List stored snapshots
    History {
        /// Number of snapshots to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Delete all but the newest snapshots
    Prune {
        /// Snapshots to keep
        #[arg(short, long)]
        keep: Option<usize>,
    },

    /// Z-score outliers in a comma-separated series
    Zscore {
        /// Values, e.g. 1,2,3,40
        #[arg(long, allow_hyphen_values = true)]
        values: String,

        /// Absolute z-score threshold
        #[arg(long, default_value = "2.0")]
        threshold: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if cli.metrics {
        if let Err(e) = zeitgeist::metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed");
        }
    }

    tracing::info!("zeitgeist starting");

    match cli.command {
        Commands::Detect {
            input,
            num_topics,
            min_cluster_size,
            time_window_hours,
            window_size_hours,
            threshold,
            group_by,
        } => {
            let mut options = DetectOptions::from_config(&config.detection, &config.extractor)?;
            if let Some(n) = num_topics {
                options.num_topics = n;
            }
            if let Some(n) = min_cluster_size {
                options.min_cluster_size = n;
            }
            if let Some(h) = time_window_hours {
                options.time_window = window_hours("--time-window-hours", h)?;
            }
            if let Some(h) = window_size_hours {
                options.window_size = window_hours("--window-size-hours", h)?;
            }
            if let Some(t) = threshold {
                options.threshold_multiplier = t;
            }
            if let Some(field) = group_by {
                options.group_by = field;
            }

            tracing::info!(
                input = %input.display(),
                options = ?options,
                "Starting detect command"
            );
            let manager = TrendManager::from_config(&config)?;
            commands::detect(&manager, &input, options).await?;
        }

        Commands::Recent { ttl_secs } => {
            let ttl = ttl_secs.map_or_else(|| config.cache.ttl(), Duration::from_secs);
            tracing::info!(ttl_secs = ttl.as_secs(), "Starting recent command");
            let manager = TrendManager::from_config(&config)?;
            commands::recent(&manager, ttl).await?;
        }

        Commands::History { limit } => {
            tracing::info!(limit = %limit, "Starting history command");
            let manager = TrendManager::from_config(&config)?;
            commands::history(&manager, limit).await?;
        }

        Commands::Prune { keep } => {
            let keep = keep.unwrap_or(config.storage.retention);
            tracing::info!(keep = %keep, "Starting prune command");
            let manager = TrendManager::from_config(&config)?;
            commands::prune(&manager, keep).await?;
        }

        Commands::Zscore { values, threshold } => {
            commands::zscore(&values, threshold)?;
        }
    }

    if cli.metrics {
        match zeitgeist::metrics::encode_metrics() {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }

    tracing::info!("zeitgeist completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("zeitgeist=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("zeitgeist={level},warn")))
    };

    // Logs go to stderr so command output stays machine-readable
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    Ok(())
}
