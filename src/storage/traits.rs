use async_trait::async_trait;
use rusqlite::types::Value;

use super::{CallContext, Cursor, LookupKind, StorageResult};

/// Identifier reserved for "no row matched". Never assigned to a stored row.
pub const NOT_FOUND_ID: i64 = 0;

/// A statement plus its positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn bind_all<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params.extend(values.into_iter().map(Into::into));
        self
    }
}

/// Statements applied together: all of them or none.
pub type Batch = Vec<Statement>;

/// A row of a lookup table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub label: String,
    pub error: Option<String>,
}

impl Record {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            id: NOT_FOUND_ID,
            label: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.id == NOT_FOUND_ID && self.error.is_none()
    }
}

/// Everything that touches the store goes through here.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Run a read-only statement.
    async fn query(&self, ctx: &CallContext, stmt: Statement) -> StorageResult<Cursor>;

    /// Apply `batch` as one transaction, returning the number of changed rows.
    /// Writes from every caller are serialized.
    async fn execute(&self, ctx: &CallContext, batch: Batch) -> StorageResult<usize>;
}

/// Single-row lookups against a lookup table.
///
/// Failures are reported inside the returned [`Record`], never as `Err`, so a
/// handler can render one result per requested key.
#[async_trait]
pub trait RecordGetter: Send + Sync {
    async fn get_by_id(&self, ctx: &CallContext, kind: &LookupKind, id: i64) -> Record;
    async fn get_by_label(&self, ctx: &CallContext, kind: &LookupKind, label: &str) -> Record;
}
