pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{clock::Clock, comfort::ComfortEvaluator, store::SharedStore};
use handlers::ApiDoc;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub evaluator: ComfortEvaluator,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, history_days: i64) -> Self {
        let evaluator = ComfortEvaluator::new(store.clone(), clock.clone(), history_days);
        Self {
            store,
            evaluator,
            clock,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/health", get(handlers::health))
        .route("/profiles", get(handlers::list_profiles))
        .route("/properties", get(handlers::list_properties))
        .route("/properties/{id}", get(handlers::get_property))
        .route("/properties/{id}/comfort", get(handlers::get_property_comfort))
        .route("/properties/{id}/latest", get(handlers::get_latest_readings))
        .route("/properties/{id}/history/24hour", get(handlers::get_daily_history))
        .route("/properties/{id}/history/monthly", get(handlers::get_monthly_history))
        .route("/properties/{id}/history/yearly", get(handlers::get_yearly_history))
        .route("/realtime/ingest", post(handlers::ingest_reading))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
