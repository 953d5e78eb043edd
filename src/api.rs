// 🌐 Prediction Service - REST API with Axum

use crate::error::PredictionError;
use crate::features::{FeatureDeriver, FormulaSet};
use crate::model::{Classifier, ModelInfo};
use crate::schema::FEATURE_COLUMNS;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Shared application state
///
/// Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    model: Arc<dyn Classifier>,
    deriver: FeatureDeriver,
    info: Option<Arc<ModelInfo>>,
}

impl AppState {
    pub fn new(model: Arc<dyn Classifier>, deriver: FeatureDeriver) -> Self {
        AppState {
            model,
            deriver,
            info: None,
        }
    }

    pub fn with_info(mut self, info: ModelInfo) -> Self {
        self.info = Some(Arc::new(info));
        self
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: i64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ModelInfoResponse {
    model: Option<ModelInfo>,
    formulas: FormulaSet,
    features: Vec<&'static str>,
}

/// Request failure, mapped to a status code in one place
#[derive(Debug)]
enum ApiError {
    /// Anything the caller can fix: bad body, bad fields, unscorable row
    BadRequest(PredictionError),
    /// Inference task crashed or was cancelled
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// GET /model-info - What is being served
async fn model_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ModelInfoResponse {
        model: state.info.as_deref().cloned(),
        formulas: state.deriver.formulas(),
        features: FEATURE_COLUMNS.to_vec(),
    })
}

fn score(state: &AppState, body: &[u8]) -> Result<i64, PredictionError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| PredictionError::InvalidBody(e.to_string()))?;
    let row = state.deriver.derive_json(&value)?;
    state.model.predict(&row)
}

/// POST /predict - Score one applicant
async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();

    // Inference is CPU work; keep it off the async workers
    let task_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || score(&task_state, &body)).await;

    match outcome {
        Ok(Ok(prediction)) => {
            info!("request {} predicted class {}", request_id, prediction);
            (StatusCode::OK, Json(PredictResponse { prediction })).into_response()
        }
        Ok(Err(e)) => {
            warn!("request {} rejected ({}): {}", request_id, e.kind(), e);
            ApiError::BadRequest(e).into_response()
        }
        Err(join_error) => {
            let msg = format!("inference task failed: {}", join_error);
            error!("request {} failed: {}", request_id, msg);
            ApiError::Internal(msg).into_response()
        }
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .route("/model-info", get(model_info))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
