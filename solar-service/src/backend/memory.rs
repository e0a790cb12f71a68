use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use solar_client::domain::{
    InstallationFilter, InstallationPage, NationwideStats, Page, StateDetail, StateInfo,
    StateSummary,
};
use time::format_description::well_known::Rfc3339;

use super::{BackendError, Health, SolarBackend};
use crate::{
    aggregate,
    config::{BackendKind, DatasetConfig},
    dataset::{table::fingerprint, InstallationTable, LoadError, LoadPolicy, LoadReport, TableHandle},
    query,
};

/// Where a reload re-reads the dataset from.
#[derive(Debug, Clone)]
struct DatasetSource {
    path: PathBuf,
    policy: LoadPolicy,
    max_logged_errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The table was built from rows, not a file.
    NoSource,
    Unchanged,
    Replaced(LoadReport),
}

/// Serves every query from an immutable in-memory table.
#[derive(Debug)]
pub struct MemoryBackend {
    table: TableHandle,
    source: Option<DatasetSource>,
}

impl MemoryBackend {
    pub fn from_table(table: InstallationTable) -> Self {
        Self {
            table: TableHandle::new(table),
            source: None,
        }
    }

    /// Load the configured CSV. Blocking.
    pub fn load(cfg: &DatasetConfig) -> Result<Self, LoadError> {
        let (table, _) = InstallationTable::load(&cfg.csv_path, cfg.load_policy, cfg.max_logged_errors)?;
        Ok(Self {
            table: TableHandle::new(table),
            source: Some(DatasetSource {
                path: cfg.csv_path.clone(),
                policy: cfg.load_policy,
                max_logged_errors: cfg.max_logged_errors,
            }),
        })
    }

    pub fn table(&self) -> Arc<InstallationTable> {
        self.table.snapshot()
    }

    /// Re-read the CSV and publish a new table if its content changed.
    /// Blocking. On error the current table stays in place.
    pub fn reload(&self) -> Result<ReloadOutcome, LoadError> {
        let Some(source) = &self.source else {
            return Ok(ReloadOutcome::NoSource);
        };

        let bytes = fs::read(&source.path).map_err(|e| LoadError::Io {
            path: source.path.clone(),
            source: e,
        })?;
        if self.table.snapshot().fingerprint() == Some(fingerprint(&bytes).as_str()) {
            return Ok(ReloadOutcome::Unchanged);
        }

        let (table, report) =
            InstallationTable::from_csv_bytes(&bytes, source.policy, source.max_logged_errors)?;
        self.table.publish(table);
        Ok(ReloadOutcome::Replaced(report))
    }

    /// Periodically call [`reload`](Self::reload) on the blocking pool.
    pub fn spawn_reload(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // Skip immediate first tick
            loop {
                interval.tick().await;
                let backend = self.clone();
                match tokio::task::spawn_blocking(move || backend.reload()).await {
                    Ok(Ok(ReloadOutcome::Replaced(report))) => {
                        metrics::counter!("solar_dataset_reloads_total").increment(1);
                        tracing::info!(
                            loaded = report.loaded,
                            errors = report.errors,
                            "dataset changed, published new table"
                        );
                    }
                    Ok(Ok(_)) => tracing::debug!("dataset unchanged"),
                    Ok(Err(e)) => {
                        metrics::counter!("solar_dataset_reload_errors_total").increment(1);
                        tracing::warn!(error = %e, "dataset reload failed, keeping previous table");
                    }
                    Err(e) => tracing::error!(error = %e, "dataset reload task panicked"),
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl SolarBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn state_summaries(&self) -> Result<Vec<StateSummary>, BackendError> {
        Ok(aggregate::state_summaries(self.table().rows()))
    }

    async fn state_detail(&self, state_code: &str) -> Result<Option<StateDetail>, BackendError> {
        Ok(aggregate::state_detail(self.table().rows(), state_code))
    }

    async fn nationwide_stats(&self) -> Result<NationwideStats, BackendError> {
        Ok(aggregate::nationwide_stats(self.table().rows()))
    }

    async fn states(&self) -> Result<Vec<StateInfo>, BackendError> {
        Ok(aggregate::state_listing(self.table().rows()))
    }

    async fn installations(
        &self,
        filter: &InstallationFilter,
        page: Page,
    ) -> Result<InstallationPage, BackendError> {
        Ok(query::filter_installations(self.table().rows(), filter, page))
    }

    async fn health(&self) -> Result<Health, BackendError> {
        let table = self.table();
        Ok(Health {
            status: "ok",
            backend: self.kind(),
            installations: table.len() as i64,
            loaded_at: table.loaded_at().format(&Rfc3339).ok(),
            fingerprint: table.fingerprint().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_client::domain::Installation;

    const CSV: &str = "case_id,p_state,p_year,p_cap_ac\n1,CA,2019,10\n2,CA,2020,5\n3,NY,2018,3\n";

    fn dataset_config(path: PathBuf) -> DatasetConfig {
        DatasetConfig {
            csv_path: path,
            load_policy: LoadPolicy::NullSubstitute,
            reload_interval_secs: 0,
            max_logged_errors: 5,
        }
    }

    #[tokio::test]
    async fn answers_from_fixture_table() {
        let mut row = Installation::new(1);
        row.state = Some("CA".to_string());
        row.capacity_ac = Some(4.0);
        let backend = MemoryBackend::from_table(InstallationTable::from_rows(vec![row]));

        let stats = backend.nationwide_stats().await.unwrap();
        assert_eq!(stats.total_installations, 1);
        assert_eq!(stats.total_capacity_ac, 4.0);

        assert!(backend.state_detail("CA").await.unwrap().is_some());
        assert!(backend.state_detail("NY").await.unwrap().is_none());
        assert_eq!(backend.reload().unwrap(), ReloadOutcome::NoSource);
    }

    #[tokio::test]
    async fn health_reports_load_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solar.csv");
        fs::write(&path, CSV).unwrap();

        let backend = MemoryBackend::load(&dataset_config(path)).unwrap();
        let health = backend.health().await.unwrap();
        assert_eq!(health.backend, BackendKind::Memory);
        assert_eq!(health.installations, 3);
        assert!(health.loaded_at.is_some());
        assert_eq!(health.fingerprint, Some(fingerprint(CSV.as_bytes())));
    }

    #[test]
    fn reload_publishes_only_changed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solar.csv");
        fs::write(&path, CSV).unwrap();

        let backend = MemoryBackend::load(&dataset_config(path.clone())).unwrap();
        let before = backend.table();
        assert_eq!(backend.reload().unwrap(), ReloadOutcome::Unchanged);

        fs::write(&path, format!("{CSV}4,TX,2021,7\n")).unwrap();
        assert_eq!(
            backend.reload().unwrap(),
            ReloadOutcome::Replaced(LoadReport { loaded: 4, errors: 0 })
        );
        assert_eq!(before.len(), 3);
        assert_eq!(backend.table().len(), 4);
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solar.csv");
        fs::write(&path, CSV).unwrap();

        let backend = MemoryBackend::load(&dataset_config(path.clone())).unwrap();
        fs::write(&path, "p_state\nCA\n").unwrap();

        assert!(matches!(backend.reload(), Err(LoadError::MissingIdentifierColumn)));
        assert_eq!(backend.table().len(), 3);
    }
}
