use crate::api::AppState;
use crate::config::{EARLIEST_DATE, LATEST_DATE, TobsStation};
use crate::db::models::Station;
use crate::db::store::{RangeCheck, Store, StoreError};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;
use log::{debug, error};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const INDEX_HTML: &str = "Available Routes:<br/>\
/api/v1.0/precipitation<br/>\
/api/v1.0/stations<br/>\
/api/v1.0/tobs<br/>\
/api/v1.0/startdate(yyyy-mm-dd)/&lt;start&gt;<br/>\
/api/v1.0/startdate(yyyy-mm-dd)/&lt;start&gt;/enddate(yyyy-mm-dd)/&lt;end&gt;";

/// Failures that surface as HTTP 500.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    /// The blocking store task panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApiError::Store(e) => write!(f, "{}", e),
            ApiError::Task(e) => write!(f, "store task failed: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureObservation {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Temperature Observed")]
    pub temperature: f64,
}

fn start_out_of_range() -> String {
    format!("Sorry the input date is out of range, the earliest date is {}", EARLIEST_DATE)
}

fn range_start_out_of_range() -> String {
    format!("Sorry the input start date is out of range, the earliest date is {}", EARLIEST_DATE)
}

fn range_end_out_of_range() -> String {
    format!("Sorry the input end date is out of range, the latest date is {}", LATEST_DATE)
}

/// Run a synchronous store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(ApiError::Task)?
        .map_err(ApiError::Store)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// One single-key `{date: prcp}` object per row; rows sharing a date are not merged.
pub async fn precipitation(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let anchor = state.config.anchor_date.clone();
    let rows = with_store(&state, move |store| store.list_precipitation_since(&anchor)).await?;

    let body = rows
        .into_iter()
        .map(|(date, prcp)| {
            let mut entry = Map::with_capacity(1);
            entry.insert(date, Value::from(prcp));
            Value::Object(entry)
        })
        .collect();
    Ok(Json(body))
}

pub async fn stations(State(state): State<AppState>) -> Result<Json<Vec<Station>>, ApiError> {
    let rows = with_store(&state, |store| store.list_stations()).await?;
    Ok(Json(rows))
}

pub async fn tobs(State(state): State<AppState>) -> Result<Json<Vec<TemperatureObservation>>, ApiError> {
    let anchor = state.config.anchor_date.clone();
    let selection = state.config.tobs_station.clone();
    let rows = with_store(&state, move |store| {
        let code = match selection {
            TobsStation::Fixed(code) => code,
            TobsStation::MostActive => match store.most_active_station()? {
                Some(code) => code,
                None => return Ok(Vec::new()),
            },
        };
        debug!("tobs: reporting station {} since {}", code, anchor);
        store.list_temperature_observations(&code, &anchor)
    })
    .await?;

    let body = rows
        .into_iter()
        .map(|(date, temperature)| TemperatureObservation { date, temperature })
        .collect();
    Ok(Json(body))
}

pub async fn temperature_since(State(state): State<AppState>, Path(start): Path<String>) -> Result<Response, ApiError> {
    let lookup = start.clone();
    let outcome = with_store(&state, move |store| store.check_and_aggregate(&lookup, None)).await?;

    Ok(match outcome {
        RangeCheck::Summary(summary) => {
            let message = format!("min, max, and mean of the temperatures observed since {}", start);
            Json((message, summary)).into_response()
        }
        RangeCheck::StartMissing | RangeCheck::EndMissing => {
            debug!("start date {:?} not in store", start);
            start_out_of_range().into_response()
        }
    })
}

pub async fn temperature_between(
    State(state): State<AppState>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (lookup_start, lookup_end) = (start.clone(), end.clone());
    let outcome = with_store(&state, move |store| store.check_and_aggregate(&lookup_start, Some(&lookup_end))).await?;

    let message = match outcome {
        RangeCheck::Summary(summary) => {
            let message = format!(
                "min, max, and mean of the temperatures observed between {} and {}",
                start, end
            );
            return Ok(Json((message, summary)).into_response());
        }
        RangeCheck::StartMissing => range_start_out_of_range(),
        RangeCheck::EndMissing => range_end_out_of_range(),
    };
    debug!("date range {:?}..{:?} rejected: {}", start, end, message);
    Ok(message.into_response())
}
