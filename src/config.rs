use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub transport_base_url: String,
    pub transport_token: Option<String>,
    pub public_channel_id: String,
    pub admin_channel_id: String,
    /// Ordered cohort list; aggregation pages follow this order.
    pub cohorts: Vec<String>,
    pub scheduler_interval_ms: u64,
    pub external_timeout_ms: u64,
    pub retention_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://rides.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            transport_base_url: required("TRANSPORT_BASE_URL")?,
            transport_token: env::var("TRANSPORT_TOKEN").ok().filter(|s| !s.is_empty()),
            public_channel_id: required("PUBLIC_CHANNEL_ID")?,
            admin_channel_id: required("ADMIN_CHANNEL_ID")?,
            cohorts: parse_cohorts(
                &env::var("COHORTS").unwrap_or_else(|_| "GT,Emory,GSU".into()),
            )?,
            scheduler_interval_ms: env::var("SCHEDULER_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".into())
                .parse()?,
            external_timeout_ms: env::var("EXTERNAL_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".into())
                .parse()?,
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "180".into())
                .parse()?,
        })
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_cohorts(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut cohorts: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if cohorts.iter().any(|c| c == name) {
            anyhow::bail!("Duplicate cohort in COHORTS: {}", name);
        }
        cohorts.push(name.to_string());
    }
    if cohorts.is_empty() {
        anyhow::bail!("COHORTS must name at least one cohort");
    }
    Ok(cohorts)
}
