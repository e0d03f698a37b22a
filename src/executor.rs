//! Statement execution against a database's working copy
//!
//! Every call opens its own connection and closes it before returning, on
//! success and on failure alike. Nothing here is thread-aware; callers run
//! it on the mapper's worker.

use crate::error::{MapperError, Result};
use crate::marshal::Row;
use crate::model::{DatabaseProfile, Registry};
use crate::statement::StatementKind;
use crate::template::make_query;
use crate::value::{Params, Value};
use log::{debug, error, info, warn};
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How many rows a read should pull from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    First,
    All,
}

/// Result of a committed write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Row id of the last successful insert on the connection, 0 if none
    pub last_insert_rowid: i64,
    /// Rows changed across every executed statement
    pub affected_rows: usize,
}

/// Runs resolved statements for one registry snapshot
pub struct Executor<'a> {
    registry: &'a Registry,
    data_dir: &'a Path,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a Registry, data_dir: &'a Path) -> Self {
        Self { registry, data_dir }
    }

    /// Where the writable copy of `profile`'s database lives.
    ///
    /// The file path must stay inside the data directory.
    pub fn working_copy_path(&self, profile: &DatabaseProfile) -> Result<PathBuf> {
        let relative =
            profile
                .relative_file_path()
                .ok_or_else(|| MapperError::DatabaseOpenFailed {
                    path: profile.file_path().to_string(),
                    reason: "database file path must be relative to the data directory"
                        .to_string(),
                })?;
        Ok(self.data_dir.join(relative))
    }

    /// Run the first template of `sql_id` as a query.
    ///
    /// Later templates in a list are ignored.
    pub fn select(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: &Params,
        fetch: Fetch,
    ) -> Result<Vec<Row>> {
        let (profile, templates) = self.registry.resolve(db_name, map_name, sql_id)?;
        let template = templates
            .first()
            .ok_or_else(|| MapperError::rejected_query(""))?;

        let sql = make_query(template, params);
        if !StatementKind::classify(&sql).is_query() {
            return Err(MapperError::rejected_query(sql));
        }

        let conn = self.open(profile)?;
        debug!("[{}] query: {}", db_name, sql);
        let result = query_rows(&conn, &sql, fetch);
        close(conn, db_name);
        result
    }

    /// Run every template of `sql_id` in one transaction, in declared order.
    ///
    /// Templates that do not start with INSERT, UPDATE or DELETE are skipped.
    /// Any failure rolls the whole list back.
    pub fn update(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: &Params,
    ) -> Result<UpdateOutcome> {
        let (profile, templates) = self.registry.resolve(db_name, map_name, sql_id)?;
        let statements: Vec<String> = templates.iter().map(|t| make_query(t, params)).collect();

        let mut conn = self.open(profile)?;
        let result = apply_mutations(&mut conn, db_name, &statements);
        close(conn, db_name);
        result
    }

    fn open(&self, profile: &DatabaseProfile) -> Result<Connection> {
        let path = self.materialize(profile)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            MapperError::DatabaseOpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!("[{}] opened {}", profile.name(), path.display());
        Ok(conn)
    }

    /// Seed the working copy from the packaged database on first use.
    /// An existing working copy is never overwritten.
    fn materialize(&self, profile: &DatabaseProfile) -> Result<PathBuf> {
        let dest = self.working_copy_path(profile)?;
        if dest.exists() {
            return Ok(dest);
        }

        let open_failed = |reason: String| MapperError::DatabaseOpenFailed {
            path: dest.display().to_string(),
            reason,
        };
        let source = self.registry.seed_path(profile).ok_or_else(|| {
            open_failed(format!(
                "packaged database {} not found in bundle",
                profile.file_path()
            ))
        })?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
        }
        seed_working_copy(&source, &dest).map_err(|e| open_failed(e.to_string()))?;
        info!(
            "[{}] materialized {} from {}",
            profile.name(),
            dest.display(),
            source.display()
        );
        Ok(dest)
    }
}

/// Copy `source` to a staging file beside `dest`, then rename it into place.
///
/// The staging file is created writable whatever the seed's mode is, and is
/// deleted if any step fails, so `dest` only ever appears complete.
fn seed_working_copy(source: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".seeding-")
        .tempfile_in(parent)?;
    let mut seed = fs::File::open(source)?;
    io::copy(&mut seed, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn query_rows(conn: &Connection, sql: &str, fetch: Fetch) -> Result<Vec<Row>> {
    let failed = |e: rusqlite::Error| MapperError::failed_query(sql, e);

    let mut stmt = conn.prepare(sql).map_err(failed)?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut cursor = stmt.query([]).map_err(failed)?;

    let mut rows = Vec::new();
    while let Some(row) = cursor.next().map_err(failed)? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(failed)?;
        rows.push(Row::new(Arc::clone(&columns), values));
        if fetch == Fetch::First {
            break;
        }
    }
    Ok(rows)
}

fn apply_mutations(
    conn: &mut Connection,
    db_name: &str,
    statements: &[String],
) -> Result<UpdateOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut affected_rows = 0;

    for sql in statements {
        if !StatementKind::classify(sql).is_mutation() {
            warn!("[{}] skipping statement without a write verb: {}", db_name, sql);
            continue;
        }
        debug!("[{}] update: {}", db_name, sql);
        match tx.execute(sql, []) {
            Ok(changed) => affected_rows += changed,
            Err(e) => {
                error!("[{}] rolling back, statement failed: {}: {}", db_name, sql, e);
                if let Err(rollback) = tx.rollback() {
                    warn!("[{}] rollback failed: {}", db_name, rollback);
                }
                return Err(MapperError::failed_query(sql.as_str(), e));
            }
        }
    }

    tx.commit()?;
    Ok(UpdateOutcome {
        last_insert_rowid: conn.last_insert_rowid(),
        affected_rows,
    })
}

fn close(conn: Connection, db_name: &str) {
    match conn.close() {
        Ok(()) => debug!("[{}] closed", db_name),
        Err((_, e)) => warn!("[{}] close failed: {}", db_name, e),
    }
}
