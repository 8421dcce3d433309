use axum::http::{header, HeaderMap};

use super::errors::ApiError;

pub const ID_PARAM: &str = "id";

/// Which key a request filters lookup rows by. Values keep their order.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryFilter {
    Ids(Vec<String>),
    Labels(Vec<String>),
}

/// All values of `key` in `query`, in order of appearance.
pub fn values_of(query: Option<&str>, key: &str) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}

impl QueryFilter {
    /// Exactly one of `id` and `label_param` must be present.
    pub fn parse(query: Option<&str>, label_param: &str) -> Result<Self, ApiError> {
        let ids = values_of(query, ID_PARAM);
        let labels = values_of(query, label_param);
        match (ids.is_empty(), labels.is_empty()) {
            (false, true) => Ok(QueryFilter::Ids(ids)),
            (true, false) => Ok(QueryFilter::Labels(labels)),
            (false, false) => Err(ApiError::validation(format!(
                "both '{ID_PARAM}' and '{label_param}' given"
            ))),
            (true, true) => Err(ApiError::validation(format!(
                "one of '{ID_PARAM}' or '{label_param}' is required"
            ))),
        }
    }

    /// Identifiers for write paths. Every value must be an integer.
    pub fn into_ids(self) -> Result<Vec<i64>, ApiError> {
        match self {
            QueryFilter::Ids(raw) => parse_ints(&raw, ID_PARAM),
            QueryFilter::Labels(_) => Err(ApiError::validation(format!(
                "this method only accepts '{ID_PARAM}' filters"
            ))),
        }
    }
}

pub fn parse_ints(raw: &[String], key: &str) -> Result<Vec<i64>, ApiError> {
    raw.iter()
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::validation(format!("'{key}' value {value:?} is not an integer")))
        })
        .collect()
}

/// Accepts `application/json`, with or without parameters.
pub fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::validation("missing content type"))?;
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if mime.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "unsupported content type {content_type:?}"
        )))
    }
}
