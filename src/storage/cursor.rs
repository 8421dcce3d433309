use rusqlite::types::{FromSql, Value, ValueRef};

/// One result row, detached from the connection that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorRow {
    values: Vec<Value>,
}

impl CursorRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get<T: FromSql>(&self, idx: usize) -> rusqlite::Result<T> {
        let value = self
            .values
            .get(idx)
            .ok_or(rusqlite::Error::InvalidColumnIndex(idx))?;
        T::column_result(ValueRef::from(value)).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, value.data_type(), Box::new(err))
        })
    }
}

/// Forward-only result of a read statement.
///
/// Rows are consumed by iterating; a consumed row cannot be revisited. The
/// cursor owns its rows outright, so dropping it is all the release it needs.
#[derive(Debug)]
pub struct Cursor {
    rows: std::vec::IntoIter<CursorRow>,
}

impl Cursor {
    pub fn new(rows: Vec<CursorRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = CursorRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
