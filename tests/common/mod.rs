#![allow(dead_code)]

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use catanddog::configuration::WebConfig;
use catanddog::storage::{schema, CallContext, SqliteRepository};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const TIMEOUT: Duration = Duration::from_millis(2000);

pub struct Registry {
    pub dir: TempDir,
    pub repo: Arc<SqliteRepository>,
}

impl Registry {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("registry.sqlite3");
        let repo = SqliteRepository::new(path.to_string_lossy()).create_if_missing(true);
        repo.connect(TIMEOUT).await.expect("connect");
        repo.initialize(TIMEOUT).await.expect("initialize");
        Self {
            dir,
            repo: Arc::new(repo),
        }
    }

    pub async fn seeded() -> Self {
        let registry = Self::new().await;
        schema::seed_dictionaries(registry.repo.as_ref(), &CallContext::background())
            .await
            .expect("seed dictionaries");
        registry
    }

    pub fn app(&self) -> Router {
        self.app_with(WebConfig::default(), CancellationToken::new())
    }

    pub fn app_with(&self, web: WebConfig, shutdown: CancellationToken) -> Router {
        catanddog::rest::router(self.repo.clone(), web, shutdown)
    }

    pub async fn send(&self, method: &str, uri: &str, json: Option<&str>) -> (StatusCode, Vec<u8>) {
        send_to(self.app(), method, uri, json).await
    }

    pub async fn read(&self, uri: &str) -> Vec<catanddog::rest::RecordResponse> {
        let (status, body) = self.send("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
        serde_json::from_slice(&body).expect("record list")
    }
}

pub async fn send_to(
    app: Router,
    method: &str,
    uri: &str,
    json: Option<&str>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if json.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let body = match json {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let response = app
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, bytes.to_vec())
}

pub fn base_cmd(db_uri: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_catanddog"));
    cmd.env("DOTENV_PATH", "/nonexistent/.env")
        .env("RUST_LOG", "info")
        .arg("--db-uri")
        .arg(db_uri);
    cmd
}
