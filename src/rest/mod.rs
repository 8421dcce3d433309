use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, RawQuery, Request, State},
    http::{HeaderMap, Method},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Extension, Router,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::configuration::WebConfig;
use crate::storage::{CallContext, LookupKind, RecordGetter, Repository, LOOKUPS};

mod errors;
mod filter;
mod handlers;
mod models;
mod person;
mod update;

pub use errors::{ApiError, BAD_REQUEST, EMPTY_RESULT};
pub use models::{PersonResponse, RecordResponse};

use handlers::{health, not_found, persons};

pub struct AppState<R: ?Sized> {
    pub repo: Arc<R>,
    pub web: WebConfig,
    pub started_at: SystemTime,
    /// Cancelled on shutdown; every store call made for a request observes it.
    pub shutdown: CancellationToken,
}

impl<R: ?Sized> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            web: self.web.clone(),
            started_at: self.started_at,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<R: ?Sized> AppState<R> {
    pub fn new(repo: Arc<R>, web: WebConfig, shutdown: CancellationToken) -> Self {
        Self {
            repo,
            web,
            started_at: SystemTime::now(),
            shutdown,
        }
    }

    /// A fresh budget for one request, cut short by shutdown.
    pub fn call_context(&self) -> CallContext {
        CallContext::with_budget(self.web.request_timeout)
            .with_cancellation(self.shutdown.child_token())
    }
}

/// Identifier assigned to every inbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    let span = tracing::info_span!(
        "request",
        id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );
    req.extensions_mut().insert(id);
    next.run(req).instrument(span).await
}

fn lookup_route<R>(router: Router<AppState<R>>, kind: &'static LookupKind) -> Router<AppState<R>>
where
    R: Repository + RecordGetter + 'static,
{
    router.route(
        kind.path,
        any(
            move |State(state): State<AppState<R>>,
                  method: Method,
                  RawQuery(query): RawQuery,
                  request_id: Option<Extension<RequestId>>,
                  headers: HeaderMap,
                  body: Bytes| async move {
                handlers::lookup(kind, state, method, query, request_id, headers, body).await
            },
        ),
    )
}

pub fn router<R>(repo: Arc<R>, web: WebConfig, shutdown: CancellationToken) -> Router
where
    R: Repository + RecordGetter + 'static,
{
    let body_limit = web.max_body_bytes;
    let state = AppState::new(repo, web, shutdown);

    let mut app = Router::new()
        .route("/health", get(health::<R>))
        .route("/person", get(persons::<R>));
    for kind in LOOKUPS {
        app = lookup_route(app, kind);
    }

    app.fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(assign_request_id))
        .with_state(state)
}

pub async fn serve<R>(
    repo: Arc<R>,
    web: WebConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    R: Repository + RecordGetter + 'static,
{
    let addr: SocketAddr = web.listen;
    log::info!("🌐 REST service on http://{}", addr);

    let app = router(repo, web, shutdown.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
