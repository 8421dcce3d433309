use std::sync::Arc;

use anyhow::{Context, Result};

use crate::context;
use crate::storage::{schema, CallContext, SqliteRepository};

/// Connect, create the schema and seed the dictionaries as configured.
///
/// Any failure here is fatal: the caller must not start serving.
pub async fn init_storage(ctx: &context::Context) -> Result<Arc<SqliteRepository>> {
    let db = &ctx.config.db;
    let repo = SqliteRepository::new(db.uri.clone())
        .with_call_timeout(db.timeout)
        .create_if_missing(db.init);

    repo.connect(db.timeout)
        .await
        .with_context(|| format!("connecting to {}", db.uri))?;

    if db.init {
        repo.initialize(db.timeout)
            .await
            .context("initializing schema")?;
    }
    if db.seed {
        schema::seed_dictionaries(&repo, &CallContext::with_budget(db.timeout))
            .await
            .context("seeding dictionaries")?;
    }
    Ok(Arc::new(repo))
}
