pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use config::Config;
use services::clock::Clock;
use services::transport::{Outbound, Transport};

/// Application state shared by handlers, the scheduler, and maintenance tools.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Transport calls bounded by the configured timeout.
    pub fn outbound(&self) -> Outbound<'_> {
        Outbound::new(self.transport.as_ref(), self.config.external_timeout())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
