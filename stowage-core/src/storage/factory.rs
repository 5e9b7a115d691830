use super::{ContentStore, FsContentStore, ObjectContentStore, S3Settings};
use crate::{Result, StowageError};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ContentStoreBuilder {
    backend: Option<String>,
    fs_root: Option<PathBuf>,
    s3: Option<S3Settings>,
    prefix: Option<String>,
}

impl ContentStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn fs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.fs_root = Some(root.into());
        self
    }

    pub fn s3(mut self, settings: S3Settings) -> Self {
        self.s3 = Some(settings);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn resolve_backend(&self) -> Result<String> {
        let backend = self
            .backend
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if backend.is_empty() {
            return Err(StowageError::Config(
                "content backend cannot be empty".to_string(),
            ));
        }

        Ok(backend)
    }

    pub fn build(&self) -> Result<Arc<dyn ContentStore>> {
        let backend = self.resolve_backend()?;

        match backend.as_str() {
            "fs" => {
                let root = self.fs_root.clone().ok_or_else(|| {
                    StowageError::Config("fs root is required for fs backend".to_string())
                })?;

                if root.as_os_str().is_empty() {
                    return Err(StowageError::Config(
                        "fs root cannot be empty for fs backend".to_string(),
                    ));
                }

                Ok(Arc::new(FsContentStore::new(root)?))
            }
            "s3" => {
                let settings = self.s3.as_ref().ok_or_else(|| {
                    StowageError::Config("s3 settings are required for s3 backend".to_string())
                })?;

                if settings.bucket.trim().is_empty() {
                    return Err(StowageError::Config(
                        "s3 bucket cannot be empty for s3 backend".to_string(),
                    ));
                }

                Ok(Arc::new(ObjectContentStore::s3(settings, self.prefix.clone())?))
            }
            "memory" => Ok(Arc::new(ObjectContentStore::in_memory(self.prefix.clone()))),
            other => Err(StowageError::Config(format!(
                "unsupported content backend: {}",
                other
            ))),
        }
    }
}
