use std::time::Duration;

use thiserror::Error;

/// Underlying reason a storage call failed.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
    #[error("call cancelled by caller")]
    Cancelled,
    #[error("storage worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: Cause,
    },
    #[error("repository is already connected")]
    AlreadyConnected,
    #[error("db connection is not set")]
    NotConnected,
    #[error("init db error: {source}")]
    Schema {
        #[source]
        source: Cause,
    },
    #[error("statement is not read-only: {sql}")]
    NotReadOnly { sql: String },
    #[error("failed query: {source}")]
    Query {
        #[source]
        source: Cause,
    },
    #[error("failed to {stage} transaction: {source}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: Cause,
    },
    #[error("failed operation #{index} [{sql}], rolled back: {source}")]
    Execution {
        index: usize,
        sql: String,
        #[source]
        source: Cause,
    },
}

impl StorageError {
    pub(crate) fn query(source: impl Into<Cause>) -> Self {
        StorageError::Query {
            source: source.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
