//! The public mapper handle
//!
//! [`SqliteMapper`] is cheap to clone; every clone talks to the same worker.
//! Each operation comes in three shapes:
//!
//! - blocking: `select_one`, `select_list`, `update`
//! - async: `*_async`, resolved once the worker has finished the call
//! - callback: `*_with`, the callback runs on the completion thread
//!
//! Setup, selects and updates all run on the worker, one at a time, in the
//! order they were submitted.

use crate::bundle::ResourceBundle;
use crate::config::MapperConfig;
use crate::error::{MapperError, Result};
use crate::executor::{Executor, Fetch, UpdateOutcome};
use crate::marshal::{self, FromRow, Row};
use crate::model::{DatabaseProfile, Registry};
use crate::template;
use crate::value::Params;
use crate::worker::{QueueHandle, SerialQueue};
use log::{info, warn};
use parking_lot::RwLock;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of an update in the callback shape
#[derive(Debug)]
pub struct UpdateReport {
    pub success: bool,
    /// Last inserted row id, 0 on failure
    pub last_insert_id: i64,
    pub error: Option<MapperError>,
}

impl From<Result<UpdateOutcome>> for UpdateReport {
    fn from(result: Result<UpdateOutcome>) -> Self {
        match result {
            Ok(outcome) => UpdateReport {
                success: true,
                last_insert_id: outcome.last_insert_rowid,
                error: None,
            },
            Err(error) => UpdateReport {
                success: false,
                last_insert_id: 0,
                error: Some(error),
            },
        }
    }
}

/// Names one statement: database, statement map and statement id
#[derive(Debug, Clone)]
struct Target {
    db_name: String,
    map_name: String,
    sql_id: String,
}

impl Target {
    fn new(db_name: &str, map_name: &str, sql_id: &str) -> Self {
        Self {
            db_name: db_name.to_string(),
            map_name: map_name.to_string(),
            sql_id: sql_id.to_string(),
        }
    }
}

/// What a worker job needs: the current registry and where databases live
#[derive(Clone)]
struct JobContext {
    registry: Arc<RwLock<Arc<Registry>>>,
    data_dir: PathBuf,
}

impl JobContext {
    fn snapshot(&self) -> Arc<Registry> {
        self.registry.read().clone()
    }

    fn select(self, target: Target, params: Params, fetch: Fetch) -> Result<Vec<Row>> {
        let registry = self.snapshot();
        Executor::new(&registry, &self.data_dir).select(
            &target.db_name,
            &target.map_name,
            &target.sql_id,
            &params,
            fetch,
        )
    }

    fn update(self, target: Target, params: Params) -> Result<UpdateOutcome> {
        let registry = self.snapshot();
        Executor::new(&registry, &self.data_dir).update(
            &target.db_name,
            &target.map_name,
            &target.sql_id,
            &params,
        )
    }
}

struct Inner {
    config: MapperConfig,
    context: JobContext,
    // Declared before `completion` so the worker drains, and drops its
    // completion handles, before the completion thread is joined.
    worker: SerialQueue,
    completion: SerialQueue,
}

/// Executes statement maps against configured SQLite databases
///
/// # Examples
///
/// ```no_run
/// use rust_sqlmapper::{DirectoryBundle, MapperConfig, Params, Row, SqliteMapper};
///
/// # fn main() -> rust_sqlmapper::Result<()> {
/// let mapper = SqliteMapper::new(MapperConfig::new("./data"))?;
/// mapper.setup("sqlitemap-config", DirectoryBundle::new("./resources"))?;
///
/// let params = Params::new().with_value("name", "steve").with_value("age", 21);
/// mapper.update("ex1", "ex1-sqlmap1", "insert-developer", params)?;
///
/// let rows: Vec<Row> = mapper.select_list("ex1", "ex1-sqlmap1", "select", Params::new())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteMapper {
    inner: Arc<Inner>,
}

impl SqliteMapper {
    /// Start the worker and completion threads with an empty registry.
    pub fn new(config: MapperConfig) -> Result<Self> {
        let worker = SerialQueue::spawn(&config.worker_name)?;
        let completion = SerialQueue::spawn(&config.completion_name())?;
        let context = JobContext {
            registry: Arc::new(RwLock::new(Arc::new(Registry::empty()))),
            data_dir: config.data_dir.clone(),
        };
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                context,
                worker,
                completion,
            }),
        })
    }

    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    /// Load `config_name` from `bundle` and replace the registry with it.
    ///
    /// Runs on the worker. If loading fails the previous registry stays.
    pub fn setup<B>(&self, config_name: &str, bundle: B) -> Result<()>
    where
        B: ResourceBundle + 'static,
    {
        let bundle: Arc<dyn ResourceBundle> = Arc::new(bundle);
        let config_name = config_name.to_string();
        let registry = Arc::clone(&self.inner.context.registry);

        self.inner.worker.run(move || -> Result<()> {
            let loaded = Registry::load(&config_name, bundle)?;
            info!("setup from {}: {} database(s)", config_name, loaded.len());
            *registry.write() = Arc::new(loaded);
            Ok(())
        })?
    }

    /// Profile of `db_name`, or `None` if setup did not define it.
    pub fn db_model(&self, db_name: &str) -> Option<Arc<DatabaseProfile>> {
        self.inner.context.snapshot().get(db_name)
    }

    /// Substitute parameters into a template without touching any database.
    pub fn make_query(&self, template: &str, params: &Params) -> String {
        template::make_query(template, params)
    }

    /// First row of the statement as a record, `None` if it returned no rows.
    pub fn select_one<T: FromRow>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> Result<Option<T>> {
        let target = Target::new(db_name, map_name, sql_id);
        let rows = self.run_select(target, params, Fetch::First)?;
        marshal::first_record(&rows)
    }

    /// Every row of the statement as a record, in result order.
    pub fn select_list<T: FromRow>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> Result<Vec<T>> {
        let target = Target::new(db_name, map_name, sql_id);
        let rows = self.run_select(target, params, Fetch::All)?;
        marshal::records(&rows)
    }

    /// Run the statement list in one transaction.
    pub fn update(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> Result<UpdateOutcome> {
        let context = self.inner.context.clone();
        let target = Target::new(db_name, map_name, sql_id);
        self.inner.worker.run(move || context.update(target, params))?
    }

    pub fn select_one_async<T: FromRow>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> impl Future<Output = Result<Option<T>>> {
        let context = self.inner.context.clone();
        let target = Target::new(db_name, map_name, sql_id);
        let pending = self
            .inner
            .worker
            .run_async(move || context.select(target, params, Fetch::First));
        async move { marshal::first_record(&pending.await??) }
    }

    pub fn select_list_async<T: FromRow>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> impl Future<Output = Result<Vec<T>>> {
        let context = self.inner.context.clone();
        let target = Target::new(db_name, map_name, sql_id);
        let pending = self
            .inner
            .worker
            .run_async(move || context.select(target, params, Fetch::All));
        async move { marshal::records(&pending.await??) }
    }

    pub fn update_async(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
    ) -> impl Future<Output = Result<UpdateOutcome>> {
        let context = self.inner.context.clone();
        let target = Target::new(db_name, map_name, sql_id);
        let pending = self
            .inner
            .worker
            .run_async(move || context.update(target, params));
        async move { pending.await? }
    }

    /// Queue a single-record select; `callback` runs on the completion thread.
    ///
    /// Returns an error only if the worker is gone and nothing was queued.
    pub fn select_one_with<T, F>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
        callback: F,
    ) -> Result<()>
    where
        T: FromRow + 'static,
        F: FnOnce(Result<Option<T>>) + Send + 'static,
    {
        let target = Target::new(db_name, map_name, sql_id);
        self.queue_select(target, params, Fetch::First, move |rows| {
            callback(rows.and_then(|rows| marshal::first_record(&rows)))
        })
    }

    /// Queue a list select; `callback` runs on the completion thread.
    pub fn select_list_with<T, F>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
        callback: F,
    ) -> Result<()>
    where
        T: FromRow + 'static,
        F: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let target = Target::new(db_name, map_name, sql_id);
        self.queue_select(target, params, Fetch::All, move |rows| {
            callback(rows.and_then(|rows| marshal::records(&rows)))
        })
    }

    /// Queue an update; `callback` runs on the completion thread.
    pub fn update_with<F>(
        &self,
        db_name: &str,
        map_name: &str,
        sql_id: &str,
        params: Params,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(UpdateReport) + Send + 'static,
    {
        let context = self.inner.context.clone();
        let target = Target::new(db_name, map_name, sql_id);
        let completion = self.inner.completion.handle()?;
        self.inner.worker.submit(Box::new(move || {
            let report = UpdateReport::from(context.update(target, params));
            deliver(&completion, move || callback(report));
        }))
    }

    fn run_select(&self, target: Target, params: Params, fetch: Fetch) -> Result<Vec<Row>> {
        let context = self.inner.context.clone();
        self.inner
            .worker
            .run(move || context.select(target, params, fetch))?
    }

    fn queue_select<F>(&self, target: Target, params: Params, fetch: Fetch, finish: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<Row>>) + Send + 'static,
    {
        let context = self.inner.context.clone();
        let completion = self.inner.completion.handle()?;
        self.inner.worker.submit(Box::new(move || {
            let rows = context.select(target, params, fetch);
            deliver(&completion, move || finish(rows));
        }))
    }
}

fn deliver(completion: &QueueHandle, callback: impl FnOnce() + Send + 'static) {
    if let Err(e) = completion.submit(Box::new(callback)) {
        warn!("dropping result, {}", e);
    }
}
