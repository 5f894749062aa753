//! HTTP surface.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/data` | All fields of all robots |
//! | GET | `/data/{names}` | All fields of `&`-separated robots |
//! | GET | `/data/{names}/{fields}` | Named fields of named robots |
//! | POST | `/data/{names}/{fields}` | Write form-encoded field values |
//! | GET | `/metrics` | Metric rows between `start` and `end` |
//! | GET | `/shift` | Currently active shift |

use crate::bulk::BulkData;
use crate::db::Store;
use crate::handlers;
use crate::shift::ShiftLookup;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub data: BulkData,
    pub store: Store,
    pub shift: Option<Arc<dyn ShiftLookup>>,
}

impl AppState {
    pub fn new(data: BulkData, shift: Option<Arc<dyn ShiftLookup>>) -> Self {
        let store = data.catalog().store().clone();
        Self { data, store, shift }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/data", get(handlers::get_all))
        .route("/data/{names}", get(handlers::get_robots))
        .route(
            "/data/{names}/{fields}",
            get(handlers::get_fields).post(handlers::post_fields),
        )
        .route("/metrics", get(handlers::get_metrics))
        .route("/shift", get(handlers::get_shift))
        .with_state(state)
}
