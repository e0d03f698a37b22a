//! Database profiles, statement maps and the registry that owns them
//!
//! The configuration resource is a JSON array of database records:
//!
//! ```json
//! [
//!   {
//!     "dbName": "ex1",
//!     "dbFilePath": "ex1.db",
//!     "sqlmaps": { "ex1-sqlmap1": "ex1-sqlmap1" }
//!   }
//! ]
//! ```
//!
//! Each `sqlmaps` value names another resource holding a statement map, an
//! object from statement id to either one SQL template or a list of them.
//! The keys `name`, `filePath` and `statementMapRefs` are accepted as well.

use crate::bundle::ResourceBundle;
use crate::error::{MapperError, Result};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// One statement id's worth of SQL
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StatementEntry {
    Single(String),
    Multiple(Vec<String>),
}

impl StatementEntry {
    /// Templates in declared order.
    pub fn templates(&self) -> &[String] {
        match self {
            StatementEntry::Single(sql) => std::slice::from_ref(sql),
            StatementEntry::Multiple(list) => list,
        }
    }
}

/// Statement id to SQL template(s)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StatementMap {
    entries: HashMap<String, StatementEntry>,
}

impl StatementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, sql_id: &str, entry: StatementEntry) -> Self {
        self.entries.insert(sql_id.to_string(), entry);
        self
    }

    /// Parse a loaded resource tree.
    pub fn from_tree(resource: &str, tree: serde_json::Value) -> Result<Self> {
        serde_json::from_value(tree).map_err(|e| MapperError::config(resource, e))
    }

    pub fn get(&self, sql_id: &str) -> Option<&StatementEntry> {
        self.entries.get(sql_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A database record as written in the configuration resource
#[derive(Debug, Clone, Deserialize)]
struct DatabaseRecord {
    #[serde(rename = "dbName", alias = "name")]
    name: String,
    #[serde(rename = "dbFilePath", alias = "filePath")]
    file_path: String,
    #[serde(rename = "sqlmaps", alias = "statementMapRefs", default)]
    statement_map_refs: HashMap<String, String>,
}

/// Resolved configuration for one logical database
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseProfile {
    name: String,
    file_path: String,
    statement_maps: HashMap<String, StatementMap>,
}

impl DatabaseProfile {
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<String>,
        statement_maps: HashMap<String, StatementMap>,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            statement_maps,
        }
    }

    fn from_record(record: DatabaseRecord, bundle: &dyn ResourceBundle) -> Result<Self> {
        let mut statement_maps = HashMap::with_capacity(record.statement_map_refs.len());
        for (map_name, resource) in record.statement_map_refs {
            let tree = bundle.load(&resource)?;
            let map = StatementMap::from_tree(&resource, tree)?;
            debug!(
                "loaded statement map {} ({} statements) for {}",
                map_name,
                map.len(),
                record.name
            );
            statement_maps.insert(map_name, map);
        }
        Ok(Self {
            name: record.name,
            file_path: record.file_path,
            statement_maps,
        })
    }

    /// Logical database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the packaged database, also used for the working copy
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The file path, if it stays under whatever directory it is joined to.
    /// Absolute paths and `..` components give `None`.
    pub fn relative_file_path(&self) -> Option<&Path> {
        let path = Path::new(&self.file_path);
        let mut named = false;
        for component in path.components() {
            match component {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                _ => return None,
            }
        }
        named.then_some(path)
    }

    pub fn statement_maps(&self) -> &HashMap<String, StatementMap> {
        &self.statement_maps
    }

    pub fn statement_map(&self, map_name: &str) -> Option<&StatementMap> {
        self.statement_maps.get(map_name)
    }

    /// Templates for `sql_id` in `map_name`, in declared order.
    pub fn queries(&self, map_name: &str, sql_id: &str) -> Option<&[String]> {
        self.statement_map(map_name)?
            .get(sql_id)
            .map(StatementEntry::templates)
    }
}

/// Database name to profile, built by setup and read-only afterwards
#[derive(Default)]
pub struct Registry {
    databases: HashMap<String, Arc<DatabaseProfile>>,
    bundle: Option<Arc<dyn ResourceBundle>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("databases", &self.databases)
            .field("has_bundle", &self.bundle.is_some())
            .finish()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `config_name` from `bundle` and resolve every statement map it
    /// references. Later records replace earlier ones with the same name.
    pub fn load(config_name: &str, bundle: Arc<dyn ResourceBundle>) -> Result<Self> {
        let tree = bundle.load(config_name)?;
        let records: Vec<DatabaseRecord> =
            serde_json::from_value(tree).map_err(|e| MapperError::config(config_name, e))?;

        let mut databases = HashMap::with_capacity(records.len());
        for record in records {
            let profile = DatabaseProfile::from_record(record, bundle.as_ref())?;
            if profile.relative_file_path().is_none() {
                return Err(MapperError::config(
                    config_name,
                    format!(
                        "dbFilePath \"{}\" of {} must be a relative path",
                        profile.file_path, profile.name
                    ),
                ));
            }
            databases.insert(profile.name.clone(), Arc::new(profile));
        }
        info!(
            "loaded {} database profile(s) from {}",
            databases.len(),
            config_name
        );

        Ok(Self {
            databases,
            bundle: Some(bundle),
        })
    }

    /// Build a registry from profiles constructed in code.
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = DatabaseProfile>,
        bundle: Arc<dyn ResourceBundle>,
    ) -> Self {
        Self {
            databases: profiles
                .into_iter()
                .map(|p| (p.name.clone(), Arc::new(p)))
                .collect(),
            bundle: Some(bundle),
        }
    }

    pub fn get(&self, db_name: &str) -> Option<Arc<DatabaseProfile>> {
        self.databases.get(db_name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Resolve a statement without touching storage.
    pub fn resolve(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
    ) -> Result<(&DatabaseProfile, &[String])> {
        let profile = self
            .databases
            .get(db_name)
            .ok_or_else(|| MapperError::UnknownDatabaseName {
                db_name: db_name.to_string(),
            })?;
        let templates =
            profile
                .queries(map_name, sql_id)
                .ok_or_else(|| MapperError::UnknownStatementId {
                    map_name: map_name.to_string(),
                    sql_id: sql_id.to_string(),
                })?;
        Ok((profile.as_ref(), templates))
    }

    /// Packaged copy of `profile`'s database, if the bundle has it.
    pub fn seed_path(&self, profile: &DatabaseProfile) -> Option<PathBuf> {
        self.bundle.as_ref()?.resource_path(&profile.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::MemoryBundle;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn bundle() -> MemoryBundle {
        MemoryBundle::new()
            .with_resource(
                "sqlitemap-config",
                json!([
                    {
                        "dbName": "ex1",
                        "dbFilePath": "ex1.db",
                        "sqlmaps": {"sqlmap1": "ex1-sqlmap1", "sqlmap2": "ex1-sqlmap2"}
                    }
                ]),
            )
            .with_resource(
                "ex1-sqlmap1",
                json!({
                    "insert-multiple": [
                        "INSERT INTO developer(name, age) VALUES({name1}, {age1})",
                        "INSERT INTO developer(name, age) VALUES({name2}, {age2})",
                        "INSERT INTO developer(name, age) VALUES({name3}, {age3})"
                    ],
                    "select": "SELECT * FROM developer"
                }),
            )
            .with_resource("ex1-sqlmap2", json!({}))
    }

    #[test]
    fn test_load_resolves_every_map() {
        let registry = Registry::load("sqlitemap-config", Arc::new(bundle())).unwrap();
        let profile = registry.get("ex1").unwrap();

        assert_eq!(profile.name(), "ex1");
        assert_eq!(profile.file_path(), "ex1.db");
        assert_eq!(profile.statement_maps().len(), 2);
        let inserts = profile.queries("sqlmap1", "insert-multiple").unwrap();
        assert_eq!(inserts.len(), 3);
        assert_eq!(
            inserts[0],
            "INSERT INTO developer(name, age) VALUES({name1}, {age1})"
        );
        assert_eq!(
            inserts[2],
            "INSERT INTO developer(name, age) VALUES({name3}, {age3})"
        );
        assert_eq!(
            profile.queries("sqlmap1", "select"),
            Some(&["SELECT * FROM developer".to_string()][..])
        );
        assert!(profile.statement_map("sqlmap2").unwrap().is_empty());

        let mut ids: Vec<&str> = profile.statement_map("sqlmap1").unwrap().ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, ["insert-multiple", "select"]);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["ex1"]);
    }

    #[test]
    fn test_relative_file_paths() {
        let profile = |path: &str| DatabaseProfile::new("db", path, HashMap::new());
        assert_eq!(
            profile("ex1.db").relative_file_path(),
            Some(Path::new("ex1.db"))
        );
        assert!(profile("nested/ex2.db").relative_file_path().is_some());
        assert!(profile("./ex1.db").relative_file_path().is_some());
        assert!(profile("/var/db/ex1.db").relative_file_path().is_none());
        assert!(profile("../ex1.db").relative_file_path().is_none());
        assert!(profile("nested/../../ex1.db").relative_file_path().is_none());
        assert!(profile("").relative_file_path().is_none());
    }

    #[test]
    fn test_escaping_file_path_fails_setup() {
        for file_path in ["/var/db/ex1.db", "../ex1.db"] {
            let bundle = MemoryBundle::new().with_resource(
                "cfg",
                json!([{ "dbName": "ex1", "dbFilePath": file_path }]),
            );
            let err = Registry::load("cfg", Arc::new(bundle)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigLoadFailed);
        }
    }

    #[test]
    fn test_unknown_names() {
        let registry = Registry::load("sqlitemap-config", Arc::new(bundle())).unwrap();
        assert!(registry.get("ex2").is_none());

        let err = registry.resolve("ex2", "sqlmap1", "select").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDatabaseName);
        let err = registry.resolve("ex1", "sqlmap1", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStatementId);
        let err = registry.resolve("ex1", "no-map", "select").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStatementId);
    }

    #[test]
    fn test_descriptive_keys_are_accepted() {
        let bundle = MemoryBundle::new()
            .with_resource(
                "cfg",
                json!([{ "name": "ex9", "filePath": "ex9.db", "statementMapRefs": {"m": "maps"} }]),
            )
            .with_resource("maps", json!({"one": "DELETE FROM t"}));
        let registry = Registry::load("cfg", Arc::new(bundle)).unwrap();
        let (profile, templates) = registry.resolve("ex9", "m", "one").unwrap();
        assert_eq!(profile.file_path(), "ex9.db");
        assert_eq!(templates, ["DELETE FROM t".to_string()]);
    }

    #[test]
    fn test_missing_statement_map_fails_setup() {
        let bundle = MemoryBundle::new().with_resource(
            "cfg",
            json!([{ "dbName": "ex1", "dbFilePath": "ex1.db", "sqlmaps": {"m": "gone"} }]),
        );
        let err = Registry::load("cfg", Arc::new(bundle)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigLoadFailed);
    }

    #[test]
    fn test_malformed_entries_fail_setup() {
        let bundle = MemoryBundle::new()
            .with_resource(
                "cfg",
                json!([{ "dbName": "ex1", "dbFilePath": "ex1.db", "sqlmaps": {"m": "maps"} }]),
            )
            .with_resource("maps", json!({"bad": 42}));
        let err = Registry::load("cfg", Arc::new(bundle)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigLoadFailed);

        let bundle = MemoryBundle::new().with_resource("cfg", json!({"dbName": "ex1"}));
        assert!(Registry::load("cfg", Arc::new(bundle)).is_err());
    }

    #[test]
    fn test_later_record_wins() {
        let bundle = MemoryBundle::new().with_resource(
            "cfg",
            json!([
                { "dbName": "ex1", "dbFilePath": "first.db" },
                { "dbName": "ex1", "dbFilePath": "second.db" }
            ]),
        );
        let registry = Registry::load("cfg", Arc::new(bundle)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ex1").unwrap().file_path(), "second.db");
    }
}
