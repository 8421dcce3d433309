use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{
    params_from_iter, types::Value, Connection, InterruptHandle, OpenFlags, TransactionBehavior,
};
use tokio::sync::Mutex;

use super::{
    error::Cause, lookup, schema, Batch, CallContext, Cursor, CursorRow, LookupKind, Record,
    RecordGetter, Repository, Statement, StorageError, StorageResult,
};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(1000);

const BUSY_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug)]
enum Access {
    Read,
    Write { create: bool },
}

fn open_connection(uri: &str, access: Access) -> rusqlite::Result<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    match access {
        Access::Read => flags |= OpenFlags::SQLITE_OPEN_READ_ONLY,
        Access::Write { create } => {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if create {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
    }

    let conn = Connection::open_with_flags(uri, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    if let Access::Write { .. } = access {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    Ok(conn)
}

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Shared between a caller and the blocking worker serving it.
///
/// Exactly one side wins: the worker by reaching its commit, or the caller by
/// giving up first. A worker that lost never commits.
#[derive(Default)]
struct CallGate {
    state: AtomicU8,
    interrupt: std::sync::Mutex<Option<InterruptHandle>>,
}

impl CallGate {
    fn arm(&self, handle: InterruptHandle) {
        if let Ok(mut slot) = self.interrupt.lock() {
            *slot = Some(handle);
        }
    }

    /// Forget the connection so a late `abandon` cannot reach its next user.
    fn release(&self) {
        if let Ok(mut slot) = self.interrupt.lock() {
            *slot = None;
        }
    }

    /// Returns false when the worker already started committing.
    fn abandon(&self) -> bool {
        match self
            .state
            .compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                if let Ok(slot) = self.interrupt.lock() {
                    if let Some(handle) = slot.as_ref() {
                        log::warn!("interrupting in-flight sqlite statement");
                        handle.interrupt();
                    }
                }
                true
            }
            Err(state) => state == ABANDONED,
        }
    }

    fn is_abandoned(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ABANDONED
    }

    fn begin_commit(&self) -> bool {
        self.state
            .compare_exchange(PENDING, COMMITTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Abandons the call unless disarmed, so a dropped caller stops its worker.
struct AbandonOnDrop(Option<Arc<CallGate>>);

impl AbandonOnDrop {
    fn new(gate: Arc<CallGate>) -> Self {
        Self(Some(gate))
    }

    fn fire(&self) -> bool {
        self.0.as_ref().map_or(true, |gate| gate.abandon())
    }

    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(gate) = self.0.take() {
            gate.abandon();
        }
    }
}

/// Tracks how many write batches run at once.
#[cfg(test)]
#[derive(Default)]
struct WriteMeter {
    active: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl WriteMeter {
    fn enter(self: &Arc<Self>) -> WriteMeterGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        WriteMeterGuard(self.clone())
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
struct WriteMeterGuard(Arc<WriteMeter>);

#[cfg(test)]
impl Drop for WriteMeterGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn blocking<T, F>(f: F) -> Result<T, Cause>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| Cause::Worker(err.to_string()))
}

/// Leading keyword of `sql`, skipping whitespace and comments.
fn first_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

pub(crate) fn looks_read_only(sql: &str) -> bool {
    let keyword = first_keyword(sql).to_ascii_uppercase();
    matches!(keyword.as_str(), "SELECT" | "WITH" | "VALUES")
}

fn read_rows(conn: &Connection, stmt: &Statement) -> StorageResult<Cursor> {
    let mut prepared = conn.prepare(&stmt.sql).map_err(StorageError::query)?;
    if !prepared.readonly() {
        return Err(StorageError::NotReadOnly {
            sql: stmt.sql.clone(),
        });
    }
    let width = prepared.column_count();

    let mut rows = prepared
        .query(params_from_iter(stmt.params.iter()))
        .map_err(StorageError::query)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(StorageError::query)? {
        let values = (0..width)
            .map(|idx| row.get::<_, Value>(idx))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::query)?;
        out.push(CursorRow::new(values));
    }
    Ok(Cursor::new(out))
}

fn abandoned(stage: &'static str) -> StorageError {
    StorageError::Transaction {
        stage,
        source: Cause::Cancelled,
    }
}

fn run_batch(conn: &mut Connection, batch: &[Statement], gate: &CallGate) -> StorageResult<usize> {
    gate.arm(conn.get_interrupt_handle());
    if gate.is_abandoned() {
        return Err(abandoned("begin"));
    }
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| StorageError::Transaction {
            stage: "begin",
            source: err.into(),
        })?;

    let mut changed = 0;
    for (index, op) in batch.iter().enumerate() {
        if gate.is_abandoned() {
            return Err(abandoned("finish"));
        }
        let fail = |err: rusqlite::Error| StorageError::Execution {
            index,
            sql: op.sql.clone(),
            source: err.into(),
        };
        let mut stmt = tx.prepare(&op.sql).map_err(fail)?;
        changed += stmt.execute(params_from_iter(op.params.iter())).map_err(fail)?;
    }

    // Dropping `tx` rolls back.
    if !gate.begin_commit() {
        return Err(abandoned("commit"));
    }
    tx.commit().map_err(|err| StorageError::Transaction {
        stage: "commit",
        source: err.into(),
    })?;
    Ok(changed)
}

fn apply_schema(conn: &mut Connection) -> StorageResult<()> {
    let schema_err = |err: rusqlite::Error| StorageError::Schema { source: err.into() };
    let tx = conn.transaction().map_err(schema_err)?;
    tx.execute_batch(schema::SCHEMA).map_err(schema_err)?;
    tx.commit().map_err(schema_err)
}

/// SQLite-backed [`Repository`].
///
/// Reads each open their own read-only connection and never wait on writers.
/// Writes share one connection whose lock is held for the whole transaction.
/// A write that reports an error never commits.
pub struct SqliteRepository {
    uri: String,
    call_timeout: Duration,
    create_if_missing: bool,
    writer: Arc<Mutex<Option<Connection>>>,
    connected: AtomicBool,
    #[cfg(test)]
    meter: Arc<WriteMeter>,
}

impl SqliteRepository {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            create_if_missing: false,
            writer: Arc::new(Mutex::new(None)),
            connected: AtomicBool::new(false),
            #[cfg(test)]
            meter: Default::default(),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Allow `connect` to create the database file.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> StorageResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StorageError::NotConnected)
        }
    }

    /// Open the write connection and check the store answers within `timeout`.
    pub async fn connect(&self, timeout: Duration) -> StorageResult<()> {
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Err(StorageError::AlreadyConnected);
        }

        let uri = self.uri.clone();
        let access = Access::Write {
            create: self.create_if_missing,
        };
        let ping = async move {
            blocking(move || -> Result<Connection, Cause> {
                let conn = open_connection(&uri, access)?;
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(conn)
            })
            .await?
        };

        let conn = CallContext::background()
            .bound(timeout, ping)
            .await
            .map_err(|source| StorageError::Connection {
                uri: self.uri.clone(),
                source,
            })?;

        *writer = Some(conn);
        self.connected.store(true, Ordering::SeqCst);
        log::info!("🗄️ Connected to {}", self.uri);
        Ok(())
    }

    /// Create the fixed schema if it does not exist yet.
    pub async fn initialize(&self, timeout: Duration) -> StorageResult<()> {
        let writer = self.writer.clone();
        let work = async move {
            let mut guard = writer.lock_owned().await;
            if guard.is_none() {
                return Ok(Err(StorageError::NotConnected));
            }
            blocking(move || match guard.as_mut() {
                Some(conn) => apply_schema(conn),
                None => Err(StorageError::NotConnected),
            })
            .await
        };

        CallContext::background()
            .bound(timeout, work)
            .await
            .unwrap_or_else(|source| Err(StorageError::Schema { source }))?;
        log::info!("🧱 Schema ready ({})", schema::TABLES.join(", "));
        Ok(())
    }

    /// Release the write connection. Later calls fail with `NotConnected`.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(conn) = self.writer.lock().await.take() {
            if let Err((_, err)) = conn.close() {
                log::warn!("failed to close {}: {}", self.uri, err);
                return;
            }
            log::info!("🗄️ Closed {}", self.uri);
        }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn query(&self, ctx: &CallContext, stmt: Statement) -> StorageResult<Cursor> {
        if !looks_read_only(&stmt.sql) {
            return Err(StorageError::NotReadOnly { sql: stmt.sql });
        }
        self.ensure_connected()?;

        let gate = Arc::new(CallGate::default());
        let worker_gate = gate.clone();
        let uri = self.uri.clone();
        let abandon = AbandonOnDrop::new(gate);
        let work = blocking(move || -> StorageResult<Cursor> {
            let conn = open_connection(&uri, Access::Read).map_err(StorageError::query)?;
            worker_gate.arm(conn.get_interrupt_handle());
            if worker_gate.is_abandoned() {
                return Err(StorageError::query(Cause::Cancelled));
            }
            let res = read_rows(&conn, &stmt);
            worker_gate.release();
            res
        });

        match ctx.bound(self.call_timeout, work).await {
            Ok(res) => {
                abandon.disarm();
                res
            }
            Err(cause) => Err(StorageError::query(cause)),
        }
    }

    async fn execute(&self, ctx: &CallContext, batch: Batch) -> StorageResult<usize> {
        self.ensure_connected()?;
        if batch.is_empty() {
            return Ok(0);
        }

        let gate = Arc::new(CallGate::default());
        let worker_gate = gate.clone();
        let writer = self.writer.clone();
        #[cfg(test)]
        let meter = self.meter.clone();
        // The guard moves into the worker, so the lock is held until the
        // transaction has committed or rolled back, even if we stop waiting.
        let mut worker = tokio::spawn(async move {
            let guard = writer.lock_owned().await;
            blocking(move || {
                let mut guard = guard;
                #[cfg(test)]
                let _inside = meter.enter();
                let res = match guard.as_mut() {
                    Some(conn) => run_batch(conn, &batch, &worker_gate),
                    None => Err(StorageError::NotConnected),
                };
                worker_gate.release();
                res
            })
            .await
            .unwrap_or_else(|source| {
                Err(StorageError::Transaction {
                    stage: "finish",
                    source,
                })
            })
        });

        let abandon = AbandonOnDrop::new(gate);
        let joined = ctx
            .bound(self.call_timeout, async {
                (&mut worker)
                    .await
                    .map_err(|err| Cause::Worker(err.to_string()))
            })
            .await;
        let res = match joined {
            Ok(res) => res,
            Err(cause) if abandon.fire() => Err(StorageError::Transaction {
                stage: "finish",
                source: cause,
            }),
            Err(cause) => {
                log::warn!("write outlived its call ({}) while committing", cause);
                worker.await.unwrap_or_else(|err| {
                    Err(StorageError::Transaction {
                        stage: "finish",
                        source: Cause::Worker(err.to_string()),
                    })
                })
            }
        };
        abandon.disarm();
        res
    }
}

#[async_trait]
impl RecordGetter for SqliteRepository {
    async fn get_by_id(&self, ctx: &CallContext, kind: &LookupKind, id: i64) -> Record {
        lookup::find_one(self, ctx, kind.select_by_id(id)).await
    }

    async fn get_by_label(&self, ctx: &CallContext, kind: &LookupKind, label: &str) -> Record {
        lookup::find_one(self, ctx, kind.select_by_label(label)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DOC_TYPE, ANIMAL_TYPE};
    use tokio_util::sync::CancellationToken;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    async fn ready_repo(dir: &tempfile::TempDir) -> SqliteRepository {
        let path = dir.path().join("catanddog.sqlite3");
        let repo = SqliteRepository::new(path.to_string_lossy()).create_if_missing(true);
        repo.connect(TIMEOUT).await.unwrap();
        repo.initialize(TIMEOUT).await.unwrap();
        repo
    }

    async fn count(repo: &SqliteRepository, table: &str) -> i64 {
        let mut cursor = repo
            .query(
                &CallContext::background(),
                Statement::new(format!("SELECT COUNT(*) FROM {table}")),
            )
            .await
            .unwrap();
        cursor.next().unwrap().get::<i64>(0).unwrap()
    }

    #[test]
    fn lexical_check_skips_comments() {
        assert!(looks_read_only("  select id from animal"));
        assert!(looks_read_only("-- note\n/* block */ SELECT 1"));
        assert!(looks_read_only("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(!looks_read_only("DELETE FROM animal"));
        assert!(!looks_read_only("/* SELECT */ UPDATE person SET first_name = 'x'"));
        assert!(!looks_read_only(""));
    }

    #[tokio::test]
    async fn initialize_before_connect_fails() {
        let repo = SqliteRepository::new("unused.sqlite3");
        let err = repo.initialize(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, StorageError::NotConnected));
        assert_eq!(err.to_string(), "db connection is not set");
    }

    #[tokio::test]
    async fn connect_fails_for_missing_file_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sqlite3");
        let repo = SqliteRepository::new(path.to_string_lossy());
        let err = repo.connect(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, StorageError::Connection { .. }));
        assert!(!repo.is_connected());
    }

    #[tokio::test]
    async fn connect_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        assert!(matches!(
            repo.connect(TIMEOUT).await,
            Err(StorageError::AlreadyConnected)
        ));
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_creates_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        repo.initialize(TIMEOUT).await.unwrap();

        let cursor = repo
            .query(
                &CallContext::background(),
                Statement::new("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name"),
            )
            .await
            .unwrap();
        let names: Vec<String> = cursor.map(|row| row.get(0).unwrap()).collect();
        assert_eq!(names, vec!["animal", "animal_type", "document_type", "person"]);
    }

    #[tokio::test]
    async fn query_rejects_writes_both_lexically_and_by_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let ctx = CallContext::background();

        let err = repo
            .query(&ctx, Statement::new("DELETE FROM document_type"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotReadOnly { .. }));

        let err = repo
            .query(
                &ctx,
                Statement::new("WITH t AS (SELECT 1) DELETE FROM document_type"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotReadOnly { .. }));
    }

    #[tokio::test]
    async fn execute_rolls_back_whole_batch_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let ctx = CallContext::background();

        let batch = vec![
            DOC_TYPE.insert_labels(&["passport".into()]),
            DOC_TYPE.insert_labels(&["military passport".into()]),
            Statement::new("INSERT INTO no_such_table (label) VALUES (?)").bind("x".to_string()),
        ];
        let err = repo.execute(&ctx, batch).await.unwrap_err();
        match err {
            StorageError::Execution { index, sql, .. } => {
                assert_eq!(index, 2);
                assert!(sql.contains("no_such_table"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(count(&repo, "document_type").await, 0);

        // the lock was released: the next write goes through
        let changed = repo
            .execute(&ctx, vec![DOC_TYPE.insert_labels(&["passport".into()])])
            .await
            .unwrap();
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn execute_reports_changed_rows_and_respects_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let ctx = CallContext::background();

        let changed = schema::seed_dictionaries(&repo, &ctx).await.unwrap();
        assert_eq!(changed, 5);

        let orphan = Statement::new(
            "INSERT INTO person (doc_id, doc_type, first_name, last_name, birth_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(10i64)
        .bind(99i64)
        .bind("Ada".to_string())
        .bind("Lovelace".to_string())
        .bind("1815-12-10".to_string());
        assert!(matches!(
            repo.execute(&ctx, vec![orphan]).await,
            Err(StorageError::Execution { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_execute_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::background().with_cancellation(token);

        let err = repo
            .execute(&ctx, vec![ANIMAL_TYPE.insert_labels(&["parrot".into()])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction {
                source: Cause::Cancelled,
                ..
            }
        ));
        assert_eq!(count(&repo, "animal_type").await, 0);
    }

    #[tokio::test]
    async fn getters_return_sentinel_for_missing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let ctx = CallContext::background();
        schema::seed_dictionaries(&repo, &ctx).await.unwrap();

        assert_eq!(
            repo.get_by_id(&ctx, &DOC_TYPE, 2).await,
            Record::new(2, "veterinary passport")
        );
        assert_eq!(
            repo.get_by_label(&ctx, &ANIMAL_TYPE, "cat").await,
            Record::new(2, "cat")
        );
        assert!(repo.get_by_id(&ctx, &DOC_TYPE, 42).await.is_not_found());
    }

    #[tokio::test]
    async fn closed_repository_refuses_work() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        repo.close().await;
        let ctx = CallContext::background();

        assert!(matches!(
            repo.execute(&ctx, schema::seed_batch()).await,
            Err(StorageError::NotConnected)
        ));
        assert!(matches!(
            repo.query(&ctx, DOC_TYPE.select_by_id(1)).await,
            Err(StorageError::NotConnected)
        ));
        let record = repo.get_by_id(&ctx, &DOC_TYPE, 1).await;
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn spent_budget_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ready_repo(&dir).await;
        let ctx = CallContext::with_budget(Duration::ZERO);

        let err = repo
            .execute(&ctx, vec![ANIMAL_TYPE.insert_labels(&["parrot".into()])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction {
                source: Cause::DeadlineExceeded(_),
                ..
            }
        ));
        // let the abandoned worker drain before looking
        repo.execute(&CallContext::background(), vec![DOC_TYPE.insert_labels(&["id card".into()])])
            .await
            .unwrap();
        assert_eq!(count(&repo, "animal_type").await, 0);
    }

    #[test]
    fn gate_has_a_single_winner() {
        let gate = CallGate::default();
        assert!(gate.begin_commit());
        assert!(!gate.abandon());
        assert!(!gate.is_abandoned());

        let gate = CallGate::default();
        assert!(gate.abandon());
        assert!(gate.abandon());
        assert!(gate.is_abandoned());
        assert!(!gate.begin_commit());
    }

    #[test]
    fn dropped_caller_abandons_the_call() {
        let gate = Arc::new(CallGate::default());
        drop(AbandonOnDrop::new(gate.clone()));
        assert!(gate.is_abandoned());

        let gate = Arc::new(CallGate::default());
        AbandonOnDrop::new(gate.clone()).disarm();
        assert!(!gate.is_abandoned());
        assert!(gate.begin_commit());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn write_batches_never_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(
            ready_repo(&dir)
                .await
                .with_call_timeout(Duration::from_secs(10)),
        );
        let bulk = || {
            Statement::new(
                "INSERT INTO animal_type (label) \
                 WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 5000) \
                 SELECT 'bulk ' || x FROM n",
            )
        };

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let stmt = bulk();
                tokio::spawn(async move { repo.execute(&CallContext::background(), vec![stmt]).await })
            })
            .collect();
        for writer in writers {
            assert_eq!(writer.await.unwrap().unwrap(), 5000);
        }

        assert_eq!(repo.meter.peak(), 1);
        assert_eq!(count(&repo, "animal_type").await, 40_000);
    }
}
