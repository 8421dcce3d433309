//! Lookup tables (document types, animal types) and the statements run against them.

use super::{CallContext, Record, Repository, Statement};

/// Static description of one lookup resource.
#[derive(Debug, PartialEq, Eq)]
pub struct LookupKind {
    pub name: &'static str,
    pub path: &'static str,
    pub table: &'static str,
    /// Query-string key that filters by label.
    pub label_param: &'static str,
}

pub static DOC_TYPE: LookupKind = LookupKind {
    name: "doc_type",
    path: "/doc_type",
    table: "document_type",
    label_param: "doc",
};

pub static ANIMAL_TYPE: LookupKind = LookupKind {
    name: "animal_type",
    path: "/animal_type",
    table: "animal_type",
    label_param: "type",
};

pub static LOOKUPS: [&LookupKind; 2] = [&DOC_TYPE, &ANIMAL_TYPE];

const MULTIPLE_ROWS: &str = "query to dict table yielded more than one result";

pub(crate) fn placeholders(count: usize, item: &str) -> String {
    std::iter::repeat(item)
        .take(count)
        .collect::<Vec<_>>()
        .join(", ")
}

impl LookupKind {
    pub fn select_by_id(&self, id: i64) -> Statement {
        Statement::new(format!("SELECT id, label FROM {} WHERE id = ?1", self.table)).bind(id)
    }

    pub fn select_by_label(&self, label: &str) -> Statement {
        Statement::new(format!(
            "SELECT id, label FROM {} WHERE label = ?1",
            self.table
        ))
        .bind(label.to_string())
    }

    /// One multi-row insert for all `labels`.
    pub fn insert_labels(&self, labels: &[String]) -> Statement {
        Statement::new(format!(
            "INSERT INTO {} (label) VALUES {}",
            self.table,
            placeholders(labels.len(), "(?)")
        ))
        .bind_all(labels.iter().cloned())
    }

    pub fn delete_ids(&self, ids: &[i64]) -> Statement {
        Statement::new(format!(
            "DELETE FROM {} WHERE id IN ({})",
            self.table,
            placeholders(ids.len(), "?")
        ))
        .bind_all(ids.iter().copied())
    }

    pub fn update_label(&self, id: i64, label: &str) -> Statement {
        Statement::new(format!(
            "UPDATE {} SET label = ?1 WHERE id = ?2",
            self.table
        ))
        .bind(label.to_string())
        .bind(id)
    }
}

/// Run `stmt` and reduce it to a single [`Record`].
///
/// No row gives the not-found sentinel. More than one row means the table is
/// in an inconsistent state and is reported as a failed record.
pub async fn find_one<R: Repository + ?Sized>(
    repo: &R,
    ctx: &CallContext,
    stmt: Statement,
) -> Record {
    let mut cursor = match repo.query(ctx, stmt).await {
        Ok(cursor) => cursor,
        Err(err) => {
            let msg = format!("bad DB query: {err}");
            log::error!("{}", msg);
            return Record::failed(msg);
        }
    };

    let Some(row) = cursor.next() else {
        log::debug!("lookup yielded no rows");
        return Record::not_found();
    };
    if cursor.next().is_some() {
        log::error!("{}", MULTIPLE_ROWS);
        return Record::failed(MULTIPLE_ROWS);
    }

    let record = match (row.get::<i64>(0), row.get::<String>(1)) {
        (Ok(id), Ok(label)) => Record::new(id, label),
        (Err(err), _) | (_, Err(err)) => Record::failed(format!("cannot read query result: {err}")),
    };
    log::debug!(
        "lookup result id={} label={:?} error={:?}",
        record.id,
        record.label,
        record.error
    );
    record
}
