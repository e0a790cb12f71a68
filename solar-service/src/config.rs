use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::dataset::LoadPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_cors_origin")]
    pub cors_allowed_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default)]
    pub load_policy: LoadPolicy,
    /// 0 disables periodic reloads.
    #[serde(default)]
    pub reload_interval_secs: u64,
    #[serde(default = "default_max_logged_errors")]
    pub max_logged_errors: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_logged_errors")]
    pub max_logged_errors: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub backend: BackendConfig,
    pub postgres: Option<PostgresConfig>,
    #[serde(default)]
    pub import: ImportConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("solar.csv")
}

fn default_max_logged_errors() -> usize {
    5
}

fn default_max_connections() -> u32 {
    5
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_logged_errors: default_max_logged_errors(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("SOLAR_CONFIG").unwrap_or_else(|_| "solar-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.backend.kind == BackendKind::Postgres && cfg.postgres.is_none() {
            anyhow::bail!("backend.kind = \"postgres\" requires a [postgres] section");
        }
        Ok(cfg)
    }

    pub fn postgres(&self) -> anyhow::Result<&PostgresConfig> {
        self.postgres
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("missing [postgres] section in config"))
    }
}
