use solar_client::{
    db::installation_queries as queries,
    domain::{
        InstallationFilter, InstallationPage, NationwideStats, Page, StateDetail, StateInfo,
        StateSummary,
    },
};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{BackendError, Health, SolarBackend};
use crate::config::{BackendKind, PostgresConfig};

/// Aggregates computed by PostgreSQL over the imported table.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(cfg: &PostgresConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.uri)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl SolarBackend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn state_summaries(&self) -> Result<Vec<StateSummary>, BackendError> {
        Ok(queries::state_summaries(&self.pool).await?)
    }

    async fn state_detail(&self, state_code: &str) -> Result<Option<StateDetail>, BackendError> {
        Ok(queries::state_detail(&self.pool, state_code).await?)
    }

    async fn nationwide_stats(&self) -> Result<NationwideStats, BackendError> {
        Ok(queries::nationwide_stats(&self.pool).await?)
    }

    async fn states(&self) -> Result<Vec<StateInfo>, BackendError> {
        Ok(queries::states(&self.pool).await?)
    }

    async fn installations(
        &self,
        filter: &InstallationFilter,
        page: Page,
    ) -> Result<InstallationPage, BackendError> {
        Ok(queries::installations(&self.pool, filter, page).await?)
    }

    async fn health(&self) -> Result<Health, BackendError> {
        let installations = queries::count_installations(&self.pool).await?;
        Ok(Health {
            status: "ok",
            backend: self.kind(),
            installations,
            loaded_at: None,
            fingerprint: None,
        })
    }
}
