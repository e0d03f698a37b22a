//! Declarative SQL maps executed against named SQLite databases.
//!
//! # Intention
//!
//! - Keep SQL out of application code: statements live in named statement
//!   maps, loaded once from a resource bundle, and are addressed by
//!   database name, map name and statement id.
//! - Fill `{name}` / `@{name}` placeholders from per-call parameters.
//! - Run every database operation on one worker thread so no two operations
//!   ever touch SQLite at the same time.
//! - Hand rows back as caller-defined records.
//!
//! # Architectural Boundaries
//!
//! - Only SQL-map resolution, templating, execution and row marshalling
//!   belong here.
//! - No query building, relationship mapping or connection pooling.
//!
//! # Module Organization
//!
//! - [`bundle`] - where configuration resources and packaged databases come from
//! - [`model`] - database profiles, statement maps and the registry
//! - [`template`] - placeholder substitution
//! - [`statement`] - leading-verb classification
//! - [`executor`] - connection lifecycle, reads and transactional writes
//! - [`marshal`] - rows and record construction
//! - [`mapper`] - the public, serialized API
//! - [`error`] - error types and stable codes

pub mod bundle;
pub mod config;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod marshal;
pub mod model;
pub mod statement;
pub mod template;
pub mod value;

mod worker;

pub use bundle::{DirectoryBundle, MemoryBundle, ResourceBundle};
pub use config::MapperConfig;
pub use error::{ErrorKind, MapperError, Result};
pub use executor::UpdateOutcome;
pub use mapper::{SqliteMapper, UpdateReport};
pub use marshal::{deserialize_row, FromRow, Row};
pub use model::{DatabaseProfile, Registry, StatementEntry, StatementMap};
pub use statement::StatementKind;
pub use template::make_query;
pub use value::{Params, Value};
