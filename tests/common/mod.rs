#![allow(dead_code)]

use anyhow::Result;
use rusqlite::Connection;
use rust_sqlmapper::{deserialize_row, DirectoryBundle, FromRow, MapperConfig, Row, SqliteMapper};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DB: &str = "ex1";
pub const MAP: &str = "ex1-sqlmap1";
pub const MAP2: &str = "ex1-sqlmap2";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Developer {
    pub developer_id: i64,
    pub name: String,
    pub age: i64,
}

impl FromRow for Developer {
    fn from_row(row: &Row) -> rust_sqlmapper::Result<Self> {
        deserialize_row(row)
    }
}

/// A bundle directory with the JSON fixtures and packaged databases, plus an
/// empty data directory for working copies.
pub struct TestEnv {
    pub bundle_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();

        let bundle_dir = tempfile::tempdir()?;
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        for entry in fs::read_dir(&fixtures)? {
            let entry = entry?;
            fs::copy(entry.path(), bundle_dir.path().join(entry.file_name()))?;
        }
        create_seed(&bundle_dir.path().join("ex1.db"))?;
        fs::create_dir_all(bundle_dir.path().join("nested"))?;
        create_seed(&bundle_dir.path().join("nested/ex2.db"))?;

        Ok(Self {
            bundle_dir,
            data_dir: tempfile::tempdir()?,
        })
    }

    pub fn bundle(&self) -> DirectoryBundle {
        DirectoryBundle::new(self.bundle_dir.path())
    }

    pub fn working_copy(&self, file: &str) -> PathBuf {
        self.data_dir.path().join(file)
    }

    /// A mapper set up from `sqlitemap-config`.
    pub fn mapper(&self, worker_name: &str) -> Result<SqliteMapper> {
        let config = MapperConfig::new(self.data_dir.path()).with_worker_name(worker_name);
        let mapper = SqliteMapper::new(config)?;
        mapper.setup("sqlitemap-config", self.bundle())?;
        Ok(mapper)
    }

    /// Row count read straight from the working copy, bypassing the mapper.
    pub fn developer_count(&self) -> Result<i64> {
        let conn = Connection::open(self.working_copy("ex1.db"))?;
        let count = conn.query_row("SELECT COUNT(*) FROM developer", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn create_seed(path: &Path) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE developer (
            developer_id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            age INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}
