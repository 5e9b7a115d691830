use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::{
    ClaimLedger, ContentStoreBuilder, DEFAULT_SWEEP_BATCH_SIZE, Result, S3Settings,
    SqliteClaimLedger, StorageCoordinator, StowageError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub content: ContentConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Content backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub backend: ContentBackend,
    #[serde(default)]
    pub prefix: Option<String>,
    pub fs: Option<FsConfig>,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentBackend {
    Fs,
    S3,
    Memory,
}

impl ContentBackend {
    fn as_str(&self) -> &'static str {
        match self {
            ContentBackend::Fs => "fs",
            ContentBackend::S3 => "s3",
            ContentBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: PathBuf,
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: usize,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_sweep_batch_size() -> usize {
    DEFAULT_SWEEP_BATCH_SIZE
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_retention_secs() -> u64 {
    24 * 3600
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()
            .map_err(|e| StowageError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| StowageError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn build_coordinator(&self) -> Result<StorageCoordinator> {
        let mut builder = ContentStoreBuilder::new().backend(self.content.backend.as_str());

        if let Some(prefix) = &self.content.prefix {
            builder = builder.prefix(prefix.clone());
        }
        if let Some(fs) = &self.content.fs {
            builder = builder.fs_root(fs.root.clone());
        }
        if let Some(s3) = &self.content.s3 {
            builder = builder.s3(S3Settings {
                bucket: s3.bucket.clone(),
                region: s3.region.clone(),
                endpoint: s3.endpoint.clone(),
                access_key_id: s3.access_key_id.clone(),
                secret_access_key: s3.secret_access_key.clone(),
                allow_http: s3.allow_http,
            });
        }

        let content_store = builder.build()?;

        let ledger: Arc<dyn ClaimLedger> = Arc::new(
            SqliteClaimLedger::new(&self.ledger.path)?
                .with_sweep_batch_size(self.ledger.sweep_batch_size)
                .with_busy_timeout(Duration::from_millis(self.ledger.busy_timeout_ms)),
        );

        Ok(StorageCoordinator::new(content_store, ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stowage.yaml");
        std::fs::write(
            &path,
            format!(
                "content:\n  backend: fs\n  fs:\n    root: {}\nledger:\n  path: {}\n",
                dir.path().join("blobs").display(),
                dir.path().join("ledger.db").display()
            ),
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert!(matches!(config.content.backend, ContentBackend::Fs));
        assert_eq!(config.ledger.sweep_batch_size, DEFAULT_SWEEP_BATCH_SIZE);
        assert_eq!(config.sweep.retention_secs, 86400);
        assert_eq!(config.sweep.interval(), Duration::from_secs(3600));

        config.build_coordinator().unwrap();
        assert!(dir.path().join("blobs").is_dir());
        assert!(dir.path().join("ledger.db").is_file());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let error = Config::from_file("/definitely/not/here/stowage").unwrap_err();
        assert!(matches!(error, StowageError::Config(_)));
    }
}
