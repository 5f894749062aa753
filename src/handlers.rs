//! HTTP handlers for the data, metrics and shift routes.
//!
//! Each handler delegates to the bulk endpoint or a feed and renders JSON.

use crate::api::AppState;
use crate::bulk::Selection;
use crate::error::{DbError, RecordError};
use crate::metrics;
use crate::model::parse_timestamp;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

fn error_response(msg: &str, status: StatusCode) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn record_error_status(err: &RecordError) -> StatusCode {
    match err {
        RecordError::InvalidRobotName(_) | RecordError::NotFound(_) => StatusCode::NOT_FOUND,
        RecordError::FieldNotFound(_) | RecordError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn db_error_status(err: &DbError) -> StatusCode {
    match err {
        DbError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn read_data(state: &AppState, robots: &str, fields: &str) -> Response {
    info!(robots, fields, "'/data' accessed");
    let robots = Selection::from_segment(robots);
    let fields = Selection::from_segment(fields);
    match state.data.read(&robots, &fields).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => {
            warn!(%e, "read failed");
            error_response(&e.to_string(), record_error_status(&e))
        }
    }
}

/// GET /data
pub async fn get_all(State(state): State<AppState>) -> Response {
    read_data(&state, "all", "all").await
}

/// GET /data/{names}
pub async fn get_robots(State(state): State<AppState>, Path(robots): Path<String>) -> Response {
    read_data(&state, &robots, "all").await
}

/// GET /data/{names}/{fields}
pub async fn get_fields(
    State(state): State<AppState>,
    Path((robots, fields)): Path<(String, String)>,
) -> Response {
    read_data(&state, &robots, &fields).await
}

/// POST /data/{names}/{fields}
///
/// The form body carries the values; the `fields` segment only names the
/// route.
pub async fn post_fields(
    State(state): State<AppState>,
    Path((robots, fields)): Path<(String, String)>,
    Form(values): Form<BTreeMap<String, String>>,
) -> Response {
    info!(
        robots = %robots,
        fields = %fields,
        keys = ?values.keys().collect::<Vec<_>>(),
        "'/data' POST"
    );
    let robots = Selection::from_segment(&robots);
    let report = state.data.write(&robots, &values).await;
    (StatusCode::OK, Json(report)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

fn parse_bound(raw: Option<&str>) -> Result<Option<NaiveDateTime>, String> {
    let Some(raw) = raw else { return Ok(None) };
    if let Some(ts) = parse_timestamp(raw) {
        return Ok(Some(ts));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Some)
        .ok_or_else(|| format!("invalid date: {raw}"))
}

/// GET /metrics?start=&end=
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> Response {
    let bounds = parse_bound(params.start.as_deref())
        .and_then(|s| parse_bound(params.end.as_deref()).map(|e| (s, e)));
    let (start, end) = match bounds {
        Ok(b) => b,
        Err(msg) => return error_response(&msg, StatusCode::BAD_REQUEST),
    };
    match metrics::metrics(&state.store, start, end).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!(%e, "metrics query failed");
            error_response(&e.to_string(), db_error_status(&e))
        }
    }
}

/// GET /shift
pub async fn get_shift(State(state): State<AppState>) -> Response {
    let Some(shift) = state.shift.as_ref() else {
        return error_response("shift database not configured", StatusCode::SERVICE_UNAVAILABLE);
    };
    match shift.current_shift().await {
        Ok(Some(s)) => (StatusCode::OK, Json(s)).into_response(),
        Ok(None) => error_response("no active shift", StatusCode::NOT_FOUND),
        Err(e) => {
            error!(%e, "shift lookup failed");
            error_response(&e.to_string(), db_error_status(&e))
        }
    }
}
