use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::Instrument;

use crate::storage::{CallContext, LookupKind, Repository};

use super::errors::ApiError;

/// Decode a `{"<id>": "<label>", ...}` body.
pub fn decode_labels(body: &[u8]) -> Result<HashMap<i64, String>, ApiError> {
    let raw: HashMap<String, String> = serde_json::from_slice(body).map_err(ApiError::decode)?;
    raw.into_iter()
        .map(|(key, label)| {
            key.trim()
                .parse::<i64>()
                .map(|id| (id, label))
                .map_err(|_| ApiError::decode(format!("key {key:?} is not an integer")))
        })
        .collect()
}

async fn record_failure(failed: &Mutex<Vec<i64>>, id: i64) {
    failed.lock().await.push(id);
}

/// Apply one single-statement update per target, at most `concurrency` at a time.
///
/// Each update commits on its own. Returns the targets that failed, in target
/// order. A target with no (or a blank) label in `labels` fails without
/// touching the store. Workers are detached from the caller's cancellation and
/// always run to completion before this returns.
pub async fn update_labels<R>(
    repo: Arc<R>,
    ctx: &CallContext,
    kind: &'static LookupKind,
    targets: &[i64],
    labels: HashMap<i64, String>,
    concurrency: usize,
) -> Vec<i64>
where
    R: Repository + ?Sized + 'static,
{
    let failed = Arc::new(Mutex::new(Vec::new()));
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut seen = HashSet::new();
    let targets: Vec<i64> = targets.iter().copied().filter(|id| seen.insert(*id)).collect();

    let mut workers = Vec::with_capacity(targets.len());
    for &id in &targets {
        let Some(label) = labels.get(&id).filter(|label| !label.trim().is_empty()) else {
            log::warn!("no new label for {} {}", kind.name, id);
            record_failure(&failed, id).await;
            continue;
        };

        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => {
                log::error!("update pool closed: {}", err);
                record_failure(&failed, id).await;
                continue;
            }
        };

        let stmt = kind.update_label(id, label);
        let repo = repo.clone();
        let failed = failed.clone();
        let ctx = ctx.detached();
        let handle = tokio::spawn(
            async move {
                let _permit = permit;
                match repo.execute(&ctx, vec![stmt]).await {
                    Ok(changed) => log::debug!("updated {} {} ({} row)", kind.name, id, changed),
                    Err(err) => {
                        log::error!("failed to update {} {}: {}", kind.name, id, err);
                        record_failure(&failed, id).await;
                    }
                }
            }
            .instrument(tracing::Span::current()),
        );
        workers.push((id, handle));
    }

    for (id, handle) in workers {
        if let Err(err) = handle.await {
            log::error!("update worker for {} {} died: {}", kind.name, id, err);
            record_failure(&failed, id).await;
        }
    }

    let failed: HashSet<i64> = failed.lock().await.iter().copied().collect();
    targets.into_iter().filter(|id| failed.contains(id)).collect()
}
