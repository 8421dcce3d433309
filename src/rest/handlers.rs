use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::storage::{CallContext, LookupKind, Record, RecordGetter, Repository};

use super::{
    errors::ApiError,
    filter::{require_json, QueryFilter},
    models::{ErrorResponse, HealthResponse, PersonResponse, RecordResponse},
    person, update, AppState, RequestId,
};

pub async fn health<R: Repository + RecordGetter + 'static>(
    State(state): State<AppState<R>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_secs,
        }),
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

fn request_context(request_id: Option<Extension<RequestId>>) -> Result<RequestId, ApiError> {
    request_id
        .map(|Extension(id)| id)
        .ok_or(ApiError::MisconfiguredRequestContext("request id"))
}

/// Method dispatch for one lookup resource.
pub async fn lookup<R: Repository + RecordGetter + 'static>(
    kind: &'static LookupKind,
    state: AppState<R>,
    method: Method,
    query: Option<String>,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = request_context(request_id)?;
    log::debug!("{} {} [{}]", method, kind.path, request_id);

    let ctx = state.call_context();
    let query = query.as_deref();
    match method {
        Method::GET => {
            let records = read(state.repo.as_ref(), &ctx, kind, query).await?;
            Ok(Json(records).into_response())
        }
        Method::POST => {
            create(state.repo.as_ref(), &ctx, kind, &headers, &body).await?;
            Ok(StatusCode::OK.into_response())
        }
        Method::DELETE => {
            delete(state.repo.as_ref(), &ctx, kind, query).await?;
            Ok(StatusCode::OK.into_response())
        }
        Method::PUT | Method::PATCH => {
            let targets = QueryFilter::parse(query, kind.label_param)?.into_ids()?;
            let labels = update::decode_labels(&body)?;
            let failed = update::update_labels(
                state.repo.clone(),
                &ctx,
                kind,
                &targets,
                labels,
                state.web.update_concurrency,
            )
            .await;
            if !failed.is_empty() {
                return Err(ApiError::PartialUpdate(failed));
            }
            log::info!("✏️ Updated {} {} row(s)", targets.len(), kind.name);
            Ok(StatusCode::OK.into_response())
        }
        other => Err(ApiError::MethodNotAllowed(other)),
    }
}

/// One entry per filter value, in filter order.
pub async fn read<G: RecordGetter + ?Sized>(
    getter: &G,
    ctx: &CallContext,
    kind: &LookupKind,
    query: Option<&str>,
) -> Result<Vec<RecordResponse>, ApiError> {
    let mut records = Vec::new();
    match QueryFilter::parse(query, kind.label_param)? {
        QueryFilter::Ids(raw) => {
            for value in raw {
                let record = match value.trim().parse::<i64>() {
                    Ok(id) => getter.get_by_id(ctx, kind, id).await,
                    Err(err) => Record::failed(format!("identifier {value:?}: {err}")),
                };
                records.push(RecordResponse::from(record));
            }
        }
        QueryFilter::Labels(labels) => {
            for label in labels {
                let record = getter.get_by_label(ctx, kind, &label).await;
                records.push(RecordResponse::from(record));
            }
        }
    }
    Ok(records)
}

pub async fn create<R: Repository + ?Sized>(
    repo: &R,
    ctx: &CallContext,
    kind: &LookupKind,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<usize, ApiError> {
    require_json(headers)?;
    let labels: Vec<String> = serde_json::from_slice(body).map_err(ApiError::decode)?;
    if labels.is_empty() {
        return Err(ApiError::validation("no labels given"));
    }
    if labels.iter().any(|label| label.trim().is_empty()) {
        return Err(ApiError::validation("labels must not be blank"));
    }

    let changed = repo.execute(ctx, vec![kind.insert_labels(&labels)]).await?;
    log::info!("➕ Inserted {} {} row(s)", changed, kind.name);
    Ok(changed)
}

pub async fn delete<R: Repository + ?Sized>(
    repo: &R,
    ctx: &CallContext,
    kind: &LookupKind,
    query: Option<&str>,
) -> Result<usize, ApiError> {
    let ids = QueryFilter::parse(query, kind.label_param)?.into_ids()?;
    let changed = repo.execute(ctx, vec![kind.delete_ids(&ids)]).await?;
    log::info!("🗑️ Deleted {} {} row(s)", changed, kind.name);
    Ok(changed)
}

pub async fn persons<R: Repository + RecordGetter + 'static>(
    State(state): State<AppState<R>>,
    RawQuery(query): RawQuery,
    request_id: Option<Extension<RequestId>>,
) -> Result<Json<Vec<PersonResponse>>, ApiError> {
    request_context(request_id)?;
    let ctx = state.call_context();
    let found = person::find_persons(state.repo.as_ref(), &ctx, query.as_deref()).await?;
    Ok(Json(found))
}
