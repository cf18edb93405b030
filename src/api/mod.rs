//! HTTP surface: five read-only JSON routes plus a route listing at `/`.
//!
//! The date-range routes are also mounted under the doubled
//! `/api/v1.0/api/v1.0/...` prefix that earlier deployments published.

pub mod handlers;

use crate::config::Config;
use crate::db::store::Store;
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use log::info;
use std::sync::Arc;
use std::time::Instant;

pub const START_ROUTE: &str = "/api/v1.0/startdate(yyyy-mm-dd)/{start}";
pub const RANGE_ROUTE: &str = "/api/v1.0/startdate(yyyy-mm-dd)/{start}/enddate(yyyy-mm-dd)/{end}";
pub const LEGACY_START_ROUTE: &str = "/api/v1.0/api/v1.0/startdate(yyyy-mm-dd)/{start}";
pub const LEGACY_RANGE_ROUTE: &str = "/api/v1.0/api/v1.0/startdate(yyyy-mm-dd)/{start}/enddate(yyyy-mm-dd)/{end}";

/// Read-only state shared by every handler. Built once in `main`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        AppState {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/v1.0/precipitation", get(handlers::precipitation))
        .route("/api/v1.0/stations", get(handlers::stations))
        .route("/api/v1.0/tobs", get(handlers::tobs))
        .route(START_ROUTE, get(handlers::temperature_since))
        .route(RANGE_ROUTE, get(handlers::temperature_between))
        .route(LEGACY_START_ROUTE, get(handlers::temperature_since))
        .route(LEGACY_RANGE_ROUTE, get(handlers::temperature_between))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let resp = next.run(req).await;
    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        resp.status().as_u16(),
        started.elapsed().as_millis()
    );
    resp
}
