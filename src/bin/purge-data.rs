/// Purge announcements that ended longer ago than the retention period.
/// The running service does this every cycle; this tool is for one-off cleanup.
///
/// Usage: purge-data [--retention-days N] [--dry-run]

use std::sync::Arc;

use clap::Parser;
use rideboard::{
    config::Config,
    db,
    services::{
        announcements::AnnouncementService, clock, clock::Clock, clock::SystemClock, lifecycle,
        transport::HttpTransport,
    },
    AppState,
};

#[derive(Parser)]
#[command(name = "purge-data", about = "Purge expired announcements from the rideboard database")]
struct Args {
    /// Override RETENTION_DAYS
    #[arg(long)]
    retention_days: Option<i64>,

    /// List what would be purged without deleting anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(days) = args.retention_days {
        anyhow::ensure!(days >= 0, "--retention-days must not be negative");
        config.retention_days = days;
    }

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let cutoff = clock::cutoff(SystemClock.now(), config.retention());
    tracing::info!("Starting purge of announcements ended before {}", cutoff);

    let expired = AnnouncementService::expired(&pool, cutoff).await?;
    if args.dry_run {
        for a in &expired {
            tracing::info!("Would purge {} '{}' (ended {})", a.id, a.title, a.end_at);
        }
        tracing::info!("Dry run: {} announcement(s) eligible", expired.len());
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new(
        &config.transport_base_url,
        config.transport_token.clone(),
    ));
    let state = AppState {
        db: pool,
        config: Arc::new(config),
        transport,
        clock: Arc::new(SystemClock),
    };

    let mut purged = 0;
    for a in expired {
        match lifecycle::remove(&state, &a).await {
            Ok(()) => purged += 1,
            Err(e) => tracing::error!("Error purging {}: {}", a.id, e),
        }
    }

    tracing::info!("Data purge completed: {} announcement(s) removed", purged);
    Ok(())
}
