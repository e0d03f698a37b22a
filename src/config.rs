//! Mapper configuration

use std::path::{Path, PathBuf};

const DEFAULT_WORKER_NAME: &str = "sqlmapper-worker";

/// Runtime settings for a [`SqliteMapper`](crate::SqliteMapper)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Directory holding the writable working copy of every database
    pub data_dir: PathBuf,
    /// Thread name of the worker; the completion thread gets a
    /// `-completion` suffix
    pub worker_name: String,
}

impl MapperConfig {
    /// Create a config that keeps working copies under `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn completion_name(&self) -> String {
        format!("{}-completion", self.worker_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = MapperConfig::new("/tmp/app").with_worker_name("db");
        assert_eq!(config.data_dir(), Path::new("/tmp/app"));
        assert_eq!(config.worker_name, "db");
        assert_eq!(config.completion_name(), "db-completion");
        assert_eq!(MapperConfig::new("x").worker_name, DEFAULT_WORKER_NAME);
    }
}
