pub mod comments;
pub mod descriptions;
pub mod health;
pub mod images;
pub mod metrics;

use axum::extract::{FromRequest, Request};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;

use crate::app_state::AppState;
use crate::error::AppError;

/// JSON body extractor whose rejections use the error envelope.
///
/// Only syntax and type errors are caught here; field rules run in the use
/// case so that every violation is reported together.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::validation("body", rejection.body_text())),
        }
    }
}

/// Every application route except `/metrics`, which needs its own state.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/chat/generate-detailed-product-info",
            post(descriptions::generate_detailed_product_info),
        )
        .route("/api/comments/generate", post(comments::generate))
        .route("/api/comments/summarize", post(comments::summarize))
        .route("/api/comments/endpoints", get(comments::endpoints))
        .route("/api/images/generate", post(images::generate))
        .route("/api/images/styles", get(images::styles))
        .route("/api/images/service/status", get(images::service_status))
        .route("/api/images/list", get(images::list))
        .route("/api/images/metadata/{image_id}", get(images::metadata))
        .route("/api/images/serve/{filename}", get(images::serve))
        .route("/api/images/download/{filename}", get(images::download))
        .route("/api/images/endpoints", get(images::endpoints))
        .with_state(state)
}
