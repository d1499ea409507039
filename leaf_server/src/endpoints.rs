//! Endpoints of HTTP server.
//!
use std::{collections::BTreeMap, sync::Arc, time::Instant};

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path},
    routing::{get, post},
    Extension, Json, Router,
};
use bytes::Bytes;
use common::protocol::{
    ApiIndex, DiseaseInfoResponse, DiseaseListResponse, HealthResponse, HealthStatus,
    PredictResponse,
};

use crate::{
    catalog::{self, CATALOG},
    error::ApiError,
    inferer::{Inferer, ModelState},
    meter::METER,
    model_store::DEFAULT_ACCURACY,
    nn::decode_image,
    prediction::describe,
};

/// State shared by all handlers.
pub struct AppState {
    pub inferer: Inferer,
}

/// Build the HTTP router with all endpoints.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/info/:disease", get(disease_info))
        .route("/diseases", get(list_diseases))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(state))
}

/// API overview.
pub async fn index(Extension(state): Extension<Arc<AppState>>) -> Json<ApiIndex> {
    let accuracy = state
        .inferer
        .ready_info()
        .map(|info| info.accuracy.clone())
        .unwrap_or_else(|_| DEFAULT_ACCURACY.into());

    let endpoints = [
        ("POST /predict", "Send an image file to detect disease"),
        ("GET /health", "Check API status"),
        ("GET /diseases", "List all supported diseases"),
        ("GET /info/<disease>", "Describe a single disease"),
        ("GET /", "This help message"),
    ];
    let usage = [
        (
            "curl",
            "curl -X POST -F 'file=@leaf.jpg' http://localhost:8080/predict",
        ),
        ("cli", "leaf_client --server http://localhost:8080 predict leaf.jpg"),
    ];

    Json(ApiIndex {
        project: "🌿 Mango Leaf Disease Detector".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        accuracy,
        endpoints: to_string_map(&endpoints),
        usage: to_string_map(&usage),
        supported_diseases: catalog::class_names().iter().map(|s| s.to_string()).collect(),
    })
}

fn to_string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Health check endpoint.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let resp = match state.inferer.state() {
        ModelState::Loading => HealthResponse {
            status: HealthStatus::ModelLoading,
            model_loaded: false,
            timestamp: "unknown".into(),
            error: None,
        },
        ModelState::Ready(info) => HealthResponse {
            status: HealthStatus::Healthy,
            model_loaded: true,
            timestamp: info.timestamp(),
            error: None,
        },
        ModelState::Failed(reason) => HealthResponse {
            status: HealthStatus::ModelFailed,
            model_loaded: false,
            timestamp: "unknown".into(),
            error: Some(reason),
        },
    };

    Json(resp)
}

/// Classify the image uploaded in the `file` field of a multipart form.
pub async fn predict(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();
    match classify_upload(&state, multipart).await {
        Ok(resp) => {
            METER.record_served(start.elapsed());
            log::info!(
                "Predicted {} ({:.2}%)",
                resp.predicted_disease,
                resp.confidence
            );
            Ok(Json(resp))
        }
        Err(e) => {
            METER.record_failed();
            Err(e)
        }
    }
}

async fn classify_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictResponse, ApiError> {
    // Refuse early so clients do not upload while the model is loading
    let info = state.inferer.ready_info()?;

    let mut multipart = multipart.map_err(|e| ApiError::Multipart(e.to_string()))?;
    let upload = read_file_field(&mut multipart).await?;
    log::debug!("Received upload of {} bytes", upload.len());

    let image = tokio::task::spawn_blocking(move || decode_image(&upload))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::InvalidImage(format!("{e:#}")))?;

    let raw = state.inferer.predict(image).await?;
    let calibrated = info
        .calibrator
        .calibrate(&raw)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    describe(&calibrated, &info).map_err(|e| ApiError::Internal(format!("{e:#}")))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            return Err(ApiError::EmptyFilename);
        }
        return Ok(field.bytes().await?);
    }

    Err(ApiError::MissingFile)
}

/// Description of a single disease.
pub async fn disease_info(
    Path(disease): Path<String>,
) -> Result<Json<DiseaseInfoResponse>, ApiError> {
    let entry = catalog::lookup(&disease).ok_or(ApiError::UnknownDisease(disease))?;

    Ok(Json(DiseaseInfoResponse {
        disease: entry.name.to_owned(),
        details: entry.details(),
    }))
}

/// All supported diseases with their descriptions.
pub async fn list_diseases() -> Json<DiseaseListResponse> {
    Json(DiseaseListResponse {
        count: CATALOG.len(),
        diseases: catalog::class_names().iter().map(|s| s.to_string()).collect(),
        details: CATALOG
            .iter()
            .map(|d| (d.name.to_owned(), d.details()))
            .collect(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
