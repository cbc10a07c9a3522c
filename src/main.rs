use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rideboard::{
    config::Config,
    db, routes,
    services::{
        clock::SystemClock, dashboard::DashboardService, scheduler, transport::HttpTransport,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let transport = Arc::new(HttpTransport::new(
        &config.transport_base_url,
        config.transport_token.clone(),
    ));
    info!("Transport bridge at {}", config.transport_base_url);

    let state = AppState {
        db: pool,
        config: config.clone(),
        transport,
        clock: Arc::new(SystemClock),
    };

    match DashboardService::restore_all(&state).await {
        Ok(n) => info!("Restored {} live dashboard(s)", n),
        Err(e) => warn!("Dashboard restore failed: {}", e),
    }

    scheduler::start(state.clone());

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("rideboard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
