//! Query backends behind the HTTP API.
//!
//! Both backends answer the same questions; the API layer only sees
//! `dyn SolarBackend`.

pub mod memory;
pub mod postgres;

use serde::Serialize;
use solar_client::domain::{
    InstallationFilter, InstallationPage, NationwideStats, Page, StateDetail, StateInfo,
    StateSummary,
};

use crate::config::BackendKind;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("database query failed: {0}")]
    Query(#[from] anyhow::Error),
}

/// Liveness snapshot for `/api/health`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backend: BackendKind,
    pub installations: i64,
    /// RFC 3339; only known for the in-memory table.
    pub loaded_at: Option<String>,
    pub fingerprint: Option<String>,
}

#[async_trait::async_trait]
pub trait SolarBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn state_summaries(&self) -> Result<Vec<StateSummary>, BackendError>;

    /// `state_code` is already normalized. `None` when the state has no
    /// installations.
    async fn state_detail(&self, state_code: &str) -> Result<Option<StateDetail>, BackendError>;

    async fn nationwide_stats(&self) -> Result<NationwideStats, BackendError>;

    async fn states(&self) -> Result<Vec<StateInfo>, BackendError>;

    async fn installations(
        &self,
        filter: &InstallationFilter,
        page: Page,
    ) -> Result<InstallationPage, BackendError>;

    async fn health(&self) -> Result<Health, BackendError>;
}
