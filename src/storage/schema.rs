use super::{Batch, CallContext, Repository, Statement, StorageResult};

/// Fixed schema. Every statement is idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS document_type (
    id INTEGER PRIMARY KEY NOT NULL,
    label TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS animal_type (
    id INTEGER PRIMARY KEY NOT NULL,
    label TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS person (
    doc_id INTEGER PRIMARY KEY NOT NULL,
    doc_type INTEGER NOT NULL,
    first_name TEXT NOT NULL,
    middle_name TEXT,
    last_name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    FOREIGN KEY (doc_type) REFERENCES document_type (id)
);
CREATE TABLE IF NOT EXISTS animal (
    doc_id INTEGER PRIMARY KEY NOT NULL,
    doc_type INTEGER NOT NULL,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    animal_type INTEGER NOT NULL,
    breed TEXT NOT NULL,
    owner_doc_id INTEGER NOT NULL,
    FOREIGN KEY (doc_type) REFERENCES document_type (id),
    FOREIGN KEY (animal_type) REFERENCES animal_type (id),
    FOREIGN KEY (owner_doc_id) REFERENCES person (doc_id)
);
"#;

pub const TABLES: [&str; 4] = ["document_type", "animal_type", "person", "animal"];

pub const DOC_TYPE_SEED: [(i64, &str); 3] = [
    (1, "passport"),
    (2, "veterinary passport"),
    (3, "military passport"),
];

pub const ANIMAL_TYPE_SEED: [(i64, &str); 2] = [(1, "dog"), (2, "cat")];

fn seed_insert(table: &str, rows: &[(i64, &str)]) -> Statement {
    let values = super::lookup::placeholders(rows.len(), "(?, ?)");
    let mut stmt = Statement::new(format!("INSERT INTO {table} (id, label) VALUES {values}"));
    for (id, label) in rows {
        stmt = stmt.bind(*id).bind(label.to_string());
    }
    stmt
}

/// Clear both lookup tables and refill them with the default dictionaries.
pub fn seed_batch() -> Batch {
    vec![
        Statement::new("DELETE FROM document_type"),
        Statement::new("DELETE FROM animal_type"),
        seed_insert("document_type", &DOC_TYPE_SEED),
        seed_insert("animal_type", &ANIMAL_TYPE_SEED),
    ]
}

pub async fn seed_dictionaries<R: Repository + ?Sized>(
    repo: &R,
    ctx: &CallContext,
) -> StorageResult<usize> {
    let changed = repo.execute(ctx, seed_batch()).await?;
    log::info!("📚 Dictionaries seeded ({} rows changed)", changed);
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_batch_clears_before_inserting() {
        let batch = seed_batch();
        assert_eq!(batch.len(), 4);
        assert!(batch[0].sql.starts_with("DELETE FROM document_type"));
        assert!(batch[1].sql.starts_with("DELETE FROM animal_type"));
        assert_eq!(
            batch[2].sql,
            "INSERT INTO document_type (id, label) VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(batch[2].params.len(), 6);
        assert_eq!(batch[3].params.len(), 4);
    }
}
