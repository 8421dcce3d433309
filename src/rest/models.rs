use serde::{Deserialize, Serialize};

use crate::storage::Record;

use super::errors::record_marker;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// One entry of a lookup read. `error` is empty on success.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordResponse {
    pub id: i64,
    pub label: String,
    pub error: String,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        let error = record_marker(&record).to_string();
        Self {
            id: record.id,
            label: record.label,
            error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonResponse {
    pub doc_id: i64,
    pub doc_type: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub birth_date: String,
}
