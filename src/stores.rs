use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;

/// Connection pools for the main database and the external stores.
///
/// External stores are optional: when one is not configured (or is down),
/// reads against it degrade to empty results.
#[derive(Clone)]
pub struct Stores {
    pub main: PgPool,
    pub events: Option<PgPool>,
    pub analytics: Option<PgPool>,
    pub followups: Option<PgPool>,
    pub organizations: Option<PgPool>,
}

impl Stores {
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let main = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            main,
            events: lazy_pool("events", config.stores.events.as_deref()),
            analytics: lazy_pool("analytics", config.stores.analytics.as_deref()),
            followups: lazy_pool("followups", config.stores.followups.as_deref()),
            organizations: lazy_pool("organizations", config.stores.organizations.as_deref()),
        })
    }

    /// Every store served by one database.
    pub fn single(pool: PgPool) -> Self {
        Self {
            events: Some(pool.clone()),
            analytics: Some(pool.clone()),
            followups: Some(pool.clone()),
            organizations: Some(pool.clone()),
            main: pool,
        }
    }

    pub fn organizations(&self) -> Result<&PgPool, AppError> {
        self.organizations.as_ref().ok_or_else(|| {
            AppError::Internal("Organizations database is not configured".to_string())
        })
    }
}

fn lazy_pool(name: &str, url: Option<&str>) -> Option<PgPool> {
    let Some(url) = url else {
        tracing::warn!("Database '{name}' not configured; its pages will show no data");
        return None;
    };

    match PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(url)
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!("Invalid connection settings for database '{name}': {e}");
            None
        }
    }
}

/// Log a failed external read and fall back to an empty value.
pub fn degrade<T: Default>(store: &str, result: Result<T, sqlx::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Error reading from '{store}' database: {e}");
            T::default()
        }
    }
}
