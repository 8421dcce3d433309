use std::collections::{HashMap, HashSet};
use std::time::Duration;

use axum::http::StatusCode;
use catanddog::configuration::WebConfig;
use catanddog::storage::{CallContext, Repository, Statement, ANIMAL_TYPE};
use tokio_util::sync::CancellationToken;

mod common;

const ROWS: i64 = 300;

async fn seed_animal_types(registry: &common::Registry) {
    let seed: Vec<String> = (1..=ROWS).map(|n| format!("type {n}")).collect();
    registry
        .repo
        .execute(&CallContext::background(), vec![ANIMAL_TYPE.insert_labels(&seed)])
        .await
        .expect("seed rows");
}

async fn labels(registry: &common::Registry) -> HashMap<i64, String> {
    registry
        .repo
        .query(
            &CallContext::background(),
            Statement::new("SELECT id, label FROM animal_type"),
        )
        .await
        .expect("labels")
        .map(|row| (row.get(0).expect("id"), row.get(1).expect("label")))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_writes_never_commit() {
    let registry = common::Registry::new().await;
    seed_animal_types(&registry).await;

    let calls: Vec<_> = (1..=ROWS)
        .map(|id| {
            let repo = registry.repo.clone();
            let budget = Duration::from_micros(200 + (id as u64 % 50) * 200);
            tokio::spawn(async move {
                let stmt = ANIMAL_TYPE.update_label(id, &format!("ghost {id}"));
                let res = repo.execute(&CallContext::with_budget(budget), vec![stmt]).await;
                (id, res.is_ok())
            })
        })
        .collect();

    let mut reported = HashMap::new();
    for call in calls {
        let (id, ok) = call.await.expect("join");
        reported.insert(id, ok);
    }

    for (id, label) in labels(&registry).await {
        let committed = label == format!("ghost {id}");
        assert_eq!(reported[&id], committed, "id {id} reported ok={} but label is {label:?}", reported[&id]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_update_ids_match_what_was_not_written() {
    let registry = common::Registry::new().await;
    seed_animal_types(&registry).await;

    let ids: Vec<i64> = (1..=ROWS).collect();
    let body: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .map(|id| (id.to_string(), serde_json::Value::from(format!("ghost {id}"))))
        .collect();
    let query: Vec<String> = ids.iter().map(|id| format!("id={id}")).collect();
    let web = WebConfig {
        request_timeout: Duration::from_millis(5),
        ..WebConfig::default()
    };

    let (status, response) = common::send_to(
        registry.app_with(web, CancellationToken::new()),
        "PUT",
        &format!("/animal_type?{}", query.join("&")),
        Some(&serde_json::Value::Object(body).to_string()),
    )
    .await;
    let failed: HashSet<i64> = match status {
        StatusCode::OK => HashSet::new(),
        StatusCode::BAD_REQUEST => serde_json::from_slice::<Vec<i64>>(&response)
            .expect("failed ids")
            .into_iter()
            .collect(),
        other => panic!("unexpected status {other}"),
    };

    let unwritten: HashSet<i64> = labels(&registry)
        .await
        .into_iter()
        .filter(|(id, label)| *label != format!("ghost {id}"))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(failed, unwritten);
}

#[tokio::test]
async fn shutdown_cancels_store_calls() {
    let registry = common::Registry::seeded().await;
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let app = || registry.app_with(WebConfig::default(), shutdown.clone());

    let (status, body) =
        common::send_to(app(), "POST", "/animal_type", Some(r#"["parrot"]"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.is_empty());
    assert_eq!(labels(&registry).await.len(), 2);

    let (status, body) = common::send_to(app(), "GET", "/animal_type?id=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains(catanddog::rest::BAD_REQUEST));
}
