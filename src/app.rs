use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::SignalError;
use crate::processing::append_policy::AppendOutcome;
use crate::processing::statistics::SeriesStats;
use crate::state::app_state::{AppState, VERSION};
use crate::state::data_series::{SeriesFilter, SeriesRecord};

/// Error body shape: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<SignalError> for ApiError {
    fn from(err: SignalError) -> Self {
        Self {
            status: err.status(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl ApiError {
    fn invalid_json(rejection: &JsonRejection) -> Self {
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "invalid_json"
        };
        Self {
            status,
            code,
            message: rejection.body_text(),
        }
    }

    fn invalid_query(rejection: &QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            code: "invalid_query",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"error": {"code": self.code, "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct CreateParams {
    name: Option<String>,
    fsample: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReplaceBody {
    signal_values: Vec<f64>,
    #[serde(default)]
    signal_name: Option<String>,
    #[serde(default)]
    fsample: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConfirmParams {
    #[serde(default)]
    confirm: String,
}

#[derive(Debug, Deserialize)]
struct SubsetParams {
    start: usize,
    end: usize,
}

#[derive(Debug, Deserialize)]
struct LastParams {
    n: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    signal_id: String,
    signal_stats: SeriesStats,
}

#[derive(Debug, Serialize)]
struct ValuesResponse {
    signal_id: String,
    signal_values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fsample: Option<f64>,
}

/// Upper bound on one JSON-encoded sample, sign and exponent included.
const SAMPLE_JSON_BYTES: usize = 32;

/// Request body cap: a batch of twice the sample bound fits, never under 2 MiB.
fn body_limit(max_signal_samples: usize) -> usize {
    max_signal_samples
        .saturating_mul(2 * SAMPLE_JSON_BYTES)
        .max(2 * 1024 * 1024)
}

pub fn router(state: AppState) -> Router {
    let limit = body_limit(state.service.max_signal_samples());
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/init", post(init_signals))
        .route("/signals", get(list_signals))
        .route("/signals/all", delete(delete_all_signals))
        .route("/signals/all/", delete(delete_all_signals))
        .route(
            "/signals/:signal_id",
            get(read_signal).put(replace_signal).delete(delete_signal),
        )
        .route("/signals/new/:signal_id", post(create_signal))
        .route("/signals/append/:signal_id", patch(append_signal))
        .route("/signals/stats/:signal_id", get(signal_stats))
        .route("/signals/subset/:signal_id", get(signal_subset))
        .route("/signals/last/:signal_id", get(last_values))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

async fn root() -> String {
    format!("signalstore {VERSION} is running")
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn init_signals(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = state.run(|s| s.seed_demo()).await?;
    Ok(Json(json!({"status": "ok", "message": "signals initialized", "count": count})))
}

async fn list_signals(
    State(state): State<AppState>,
    filter: Result<Query<SeriesFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<SeriesRecord>>> {
    let Query(filter) = filter.map_err(|r| ApiError::invalid_query(&r))?;
    let records = state.run(move |s| s.list(&filter)).await?;
    Ok(Json(records))
}

async fn read_signal(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> ApiResult<Json<SeriesRecord>> {
    let record = state.run(move |s| s.get(&signal_id)).await?;
    Ok(Json(record))
}

async fn create_signal(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    params: Result<Query<CreateParams>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Query(params) = params.map_err(|r| ApiError::invalid_query(&r))?;
    let record = state
        .run(move |s| s.create(&signal_id, params.name, params.fsample))
        .await?;
    let message = format!("signal {} created", record.signal_id);
    Ok((StatusCode::CREATED, Json(json!({"message": message}))))
}

async fn replace_signal(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    body: Result<Json<ReplaceBody>, JsonRejection>,
) -> ApiResult<Json<SeriesRecord>> {
    let Json(body) = body.map_err(|r| ApiError::invalid_json(&r))?;
    let record = state
        .run(move |s| s.replace(&signal_id, body.signal_values, body.signal_name, body.fsample))
        .await?;
    Ok(Json(record))
}

async fn append_signal(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    body: Result<Json<Vec<f64>>, JsonRejection>,
) -> ApiResult<Json<AppendOutcome>> {
    let Json(batch) = body.map_err(|r| ApiError::invalid_json(&r))?;
    let outcome = state.run(move |s| s.append(&signal_id, &batch)).await?;
    Ok(Json(outcome))
}

async fn delete_signal(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let message = format!("signal {signal_id} deleted");
    state.run(move |s| s.delete(&signal_id)).await?;
    Ok(Json(json!({"message": message})))
}

async fn delete_all_signals(
    State(state): State<AppState>,
    params: Result<Query<ConfirmParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params.map_err(|r| ApiError::invalid_query(&r))?;
    let deleted = state.run(move |s| s.delete_all(&params.confirm)).await?;
    Ok(Json(json!({"message": "all signals deleted", "deleted": deleted})))
}

async fn signal_stats(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> ApiResult<Json<StatsResponse>> {
    let id = signal_id.clone();
    let signal_stats = state.run(move |s| s.stats(&id)).await?;
    Ok(Json(StatsResponse { signal_id, signal_stats }))
}

async fn signal_subset(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    params: Result<Query<SubsetParams>, QueryRejection>,
) -> ApiResult<Json<ValuesResponse>> {
    let Query(params) = params.map_err(|r| ApiError::invalid_query(&r))?;
    let id = signal_id.clone();
    let (signal_values, fsample) = state
        .run(move |s| s.subset(&id, params.start, params.end))
        .await?;
    Ok(Json(ValuesResponse {
        signal_id,
        signal_values,
        fsample: Some(fsample),
    }))
}

async fn last_values(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    params: Result<Query<LastParams>, QueryRejection>,
) -> ApiResult<Json<ValuesResponse>> {
    let Query(params) = params.map_err(|r| ApiError::invalid_query(&r))?;
    let id = signal_id.clone();
    let signal_values = state.run(move |s| s.last_n(&id, params.n)).await?;
    Ok(Json(ValuesResponse {
        signal_id,
        signal_values,
        fsample: None,
    }))
}
