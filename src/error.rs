//! Error types for SQL map resolution and execution
//!
//! Every failure that reaches a caller is a [`MapperError`]. Engine errors
//! from rusqlite are always wrapped, never surfaced bare.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MapperError>;

/// Stable error classification
///
/// The numeric codes are part of the public contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unclassified,
    UnknownStatementId,
    UnknownDatabaseName,
    InvalidOrFailedQuery,
    DatabaseOpenFailed,
    ConfigLoadFailed,
}

impl ErrorKind {
    /// Numeric code for this kind
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Unclassified => 1,
            ErrorKind::UnknownStatementId => 2,
            ErrorKind::UnknownDatabaseName => 3,
            ErrorKind::InvalidOrFailedQuery => 4,
            ErrorKind::DatabaseOpenFailed => 5,
            ErrorKind::ConfigLoadFailed => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unclassified => "unclassified",
            ErrorKind::UnknownStatementId => "unknown statement id",
            ErrorKind::UnknownDatabaseName => "unknown database name",
            ErrorKind::InvalidOrFailedQuery => "invalid or failed query",
            ErrorKind::DatabaseOpenFailed => "database open failed",
            ErrorKind::ConfigLoadFailed => "config load failed",
        };
        f.write_str(name)
    }
}

/// Errors reported by the mapper
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("dbName \"{db_name}\" does not exist")]
    UnknownDatabaseName { db_name: String },

    #[error("sqlId \"{sql_id}\" does not exist in map \"{map_name}\"")]
    UnknownStatementId { map_name: String, sql_id: String },

    #[error("Invalid query: {query}{}", failure_reason(.source))]
    InvalidOrFailedQuery {
        query: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Failed to open database at {path}: {reason}")]
    DatabaseOpenFailed { path: String, reason: String },

    #[error("Failed to load config resource \"{resource}\": {reason}")]
    ConfigLoadFailed { resource: String, reason: String },

    #[error("Unclassified error: {0}")]
    Unclassified(String),

    #[error("SQLite error: {0}")]
    Engine(#[from] rusqlite::Error),
}

impl MapperError {
    /// Stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapperError::UnknownDatabaseName { .. } => ErrorKind::UnknownDatabaseName,
            MapperError::UnknownStatementId { .. } => ErrorKind::UnknownStatementId,
            MapperError::InvalidOrFailedQuery { .. } => ErrorKind::InvalidOrFailedQuery,
            MapperError::DatabaseOpenFailed { .. } => ErrorKind::DatabaseOpenFailed,
            MapperError::ConfigLoadFailed { .. } => ErrorKind::ConfigLoadFailed,
            MapperError::Unclassified(_) | MapperError::Engine(_) => ErrorKind::Unclassified,
        }
    }

    /// Shorthand for `self.kind().code()`
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    pub(crate) fn rejected_query(query: impl Into<String>) -> Self {
        MapperError::InvalidOrFailedQuery {
            query: query.into(),
            source: None,
        }
    }

    pub(crate) fn failed_query(query: impl Into<String>, source: rusqlite::Error) -> Self {
        MapperError::InvalidOrFailedQuery {
            query: query.into(),
            source: Some(source),
        }
    }

    pub(crate) fn config(resource: impl Into<String>, reason: impl fmt::Display) -> Self {
        MapperError::ConfigLoadFailed {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

fn failure_reason(source: &Option<rusqlite::Error>) -> String {
    source
        .as_ref()
        .map(|e| format!(" ({})", e))
        .unwrap_or_default()
}

impl From<serde_json::Error> for MapperError {
    fn from(error: serde_json::Error) -> Self {
        MapperError::Unclassified(format!("Serialization error: {}", error))
    }
}
