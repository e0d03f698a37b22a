//! Resource bundles: where configuration trees and packaged databases live
//!
//! A bundle resolves a resource name to a parsed JSON tree, and a packaged
//! file name to a path on disk. The mapper never reads configuration files
//! any other way.

use crate::error::{MapperError, Result};
use serde_json::Value as Tree;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of configuration resources and packaged database files
pub trait ResourceBundle: Send + Sync {
    /// Load and parse the named resource.
    fn load(&self, name: &str) -> Result<Tree>;

    /// Path of a packaged file, if the bundle has one by that name.
    fn resource_path(&self, name: &str) -> Option<PathBuf>;
}

/// Bundle backed by a directory of JSON resources
///
/// `load("ex1-sqlmap1")` reads `<root>/ex1-sqlmap1.json`, falling back to
/// `<root>/ex1-sqlmap1` and finally to `ex1-sqlmap1` taken as a path of its
/// own.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let with_ext = self.root.join(format!("{}.json", name));
        if with_ext.is_file() {
            return Some(with_ext);
        }
        let bare = self.root.join(name);
        if bare.is_file() {
            return Some(bare);
        }
        let literal = PathBuf::from(name);
        literal.is_file().then_some(literal)
    }
}

impl ResourceBundle for DirectoryBundle {
    fn load(&self, name: &str) -> Result<Tree> {
        let path = self
            .locate(name)
            .ok_or_else(|| MapperError::config(name, "resource not found"))?;
        let data = fs::read(&path).map_err(|e| MapperError::config(name, e))?;
        serde_json::from_slice(&data).map_err(|e| MapperError::config(name, e))
    }

    fn resource_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.root.join(name);
        path.is_file().then_some(path)
    }
}

/// Bundle holding its resources in memory
///
/// Packaged files still live on disk; register them with
/// [`MemoryBundle::with_file`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    resources: HashMap<String, Tree>,
    files: HashMap<String, PathBuf>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, name: &str, tree: Tree) -> Self {
        self.resources.insert(name.to_string(), tree);
        self
    }

    pub fn with_file(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.to_string(), path.into());
        self
    }
}

impl ResourceBundle for MemoryBundle {
    fn load(&self, name: &str) -> Result<Tree> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| MapperError::config(name, "resource not found"))
    }

    fn resource_path(&self, name: &str) -> Option<PathBuf> {
        self.files.get(name).filter(|path| path.is_file()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_directory_bundle_prefers_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("maps.json"), r#"{"a": "SELECT 1"}"#).unwrap();
        fs::write(dir.path().join("maps"), r#"{"a": "SELECT 2"}"#).unwrap();

        let bundle = DirectoryBundle::new(dir.path());
        assert_eq!(bundle.load("maps").unwrap(), json!({"a": "SELECT 1"}));
    }

    #[test]
    fn test_directory_bundle_falls_back_to_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("maps.conf"), r#"["x"]"#).unwrap();

        let bundle = DirectoryBundle::new(dir.path());
        assert_eq!(bundle.load("maps.conf").unwrap(), json!(["x"]));
    }

    #[test]
    fn test_directory_bundle_reports_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ nope").unwrap();
        let bundle = DirectoryBundle::new(dir.path());

        let missing = bundle.load("absent").unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::ConfigLoadFailed);
        let malformed = bundle.load("bad").unwrap_err();
        assert_eq!(malformed.kind(), ErrorKind::ConfigLoadFailed);
    }

    #[test]
    fn test_resource_path_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ex1.db"), b"").unwrap();
        let bundle = DirectoryBundle::new(dir.path());

        assert_eq!(bundle.resource_path("ex1.db"), Some(dir.path().join("ex1.db")));
        assert_eq!(bundle.resource_path("ex2.db"), None);
    }

    #[test]
    fn test_memory_bundle() {
        let bundle = MemoryBundle::new().with_resource("cfg", json!([]));
        assert_eq!(bundle.load("cfg").unwrap(), json!([]));
        assert!(bundle.load("other").is_err());
        assert_eq!(bundle.resource_path("ex1.db"), None);
    }
}
