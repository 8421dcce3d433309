use crate::storage::{lookup, CallContext, CursorRow, Repository, Statement, StorageError};

use super::{
    errors::ApiError,
    filter::{parse_ints, values_of},
    models::PersonResponse,
};

pub const DOC_ID_PARAM: &str = "doc_id";

fn select_persons(doc_ids: &[i64]) -> Statement {
    Statement::new(format!(
        "SELECT doc_id, doc_type, first_name, middle_name, last_name, birth_date \
         FROM person WHERE doc_id IN ({}) ORDER BY doc_id",
        lookup::placeholders(doc_ids.len(), "?")
    ))
    .bind_all(doc_ids.iter().copied())
}

fn person_from_row(row: &CursorRow) -> rusqlite::Result<PersonResponse> {
    Ok(PersonResponse {
        doc_id: row.get(0)?,
        doc_type: row.get(1)?,
        first_name: row.get(2)?,
        middle_name: row.get(3)?,
        last_name: row.get(4)?,
        birth_date: row.get(5)?,
    })
}

pub async fn find_persons<R: Repository + ?Sized>(
    repo: &R,
    ctx: &CallContext,
    query: Option<&str>,
) -> Result<Vec<PersonResponse>, ApiError> {
    let raw = values_of(query, DOC_ID_PARAM);
    if raw.is_empty() {
        return Err(ApiError::validation(format!("'{DOC_ID_PARAM}' is required")));
    }
    let doc_ids = parse_ints(&raw, DOC_ID_PARAM)?;

    let cursor = repo.query(ctx, select_persons(&doc_ids)).await?;
    let persons = cursor
        .map(|row| person_from_row(&row))
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(StorageError::query)?;
    log::debug!("person search matched {} of {}", persons.len(), doc_ids.len());
    Ok(persons)
}
