use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use serde_json::{json, Value};
use strum::IntoEnumIterator;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::image::{
    GenerateImagesBody, ImageGenerationReport, ImageListQuery, ImageListing,
    ImageMetadataView, ImageStyle, StyleCatalog,
};
use crate::models::response::ApiResponse;
use crate::routes::JsonBody;
use crate::services::images::{self, ServiceReport};

/// POST /api/images/generate
pub async fn generate(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GenerateImagesBody>,
) -> Result<Json<ApiResponse<ImageGenerationReport>>, AppError> {
    let (report, message) = images::generate_images(&state.generator, request).await?;
    Ok(Json(ApiResponse::with_message(report, message)))
}

/// GET /api/images/styles
pub async fn styles() -> Json<ApiResponse<StyleCatalog>> {
    Json(ApiResponse::ok(images::styles()))
}

/// GET /api/images/service/status (503 while the generator is not ready)
pub async fn service_status(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<ServiceReport>>) {
    let report = images::service_report(&state.generator).await;
    let status = if report.service_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::ok(report)))
}

/// GET /api/images/list?page=&limit=&sessionId=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ImageListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ImageListing>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::validation("query", e.body_text()))?;
    query.validate()?;
    let listing = state.images.list(&query).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// GET /api/images/metadata/{image_id}
pub async fn metadata(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<ApiResponse<ImageMetadataView>>, AppError> {
    let view = state.images.metadata(&image_id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/images/serve/{filename}
pub async fn serve(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let image = state.images.read_image(&filename).await?;
    let headers = [
        (header::CONTENT_TYPE, image.mime_type.to_string()),
        (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        (header::ETAG, format!("\"{}\"", image.filename)),
        (header::ACCEPT_RANGES, "bytes".to_string()),
    ];
    Ok((headers, image.bytes).into_response())
}

/// GET /api/images/download/{filename}
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let image = state.images.read_image(&filename).await?;
    metrics::counter!("image_downloads_total").increment(1);
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", image.filename),
        ),
    ];
    Ok((headers, image.bytes).into_response())
}

/// GET /api/images/endpoints
pub async fn endpoints(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let styles: Vec<String> = ImageStyle::iter().map(|s| s.to_string()).collect();
    Json(ApiResponse::ok(json!({
        "title": "API de Generación de Imágenes",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API para generar imágenes de productos con un generador externo",
        "endpoints": [
            {
                "method": "POST",
                "path": "/api/images/generate",
                "description": "Genera imágenes para un producto",
                "required_body": ["productName", "productDescription"],
                "optional_body": ["style", "variations", "width", "height", "inferenceSteps", "guidanceScale"],
                "example_body": {
                    "productName": "Chocolate Premium",
                    "productDescription": "Chocolate artesanal 70% cacao con textura suave",
                    "style": "premium",
                    "variations": 3
                }
            },
            {"method": "GET", "path": "/api/images/styles", "description": "Lista de estilos disponibles para generación"},
            {"method": "GET", "path": "/api/images/service/status", "description": "Estado del servicio de generación"},
            {"method": "GET", "path": "/api/images/list", "description": "Lista paginada de imágenes generadas", "query_params": ["page", "limit", "sessionId"]},
            {"method": "GET", "path": "/api/images/serve/{filename}", "description": "Sirve imagen para mostrar en navegador", "params": ["filename"]},
            {"method": "GET", "path": "/api/images/download/{filename}", "description": "Descarga directa de imagen", "params": ["filename"]},
            {"method": "GET", "path": "/api/images/metadata/{image_id}", "description": "Metadata detallada de una imagen", "params": ["image_id"]}
        ],
        "available_styles": styles,
        "image_formats": ["PNG", "JPEG", "WEBP"],
        "max_variations_per_request": 10,
        "timeout_seconds": state.generator.timeout().as_secs()
    })))
}
