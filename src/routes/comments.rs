use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::comment::{
    CommentSummary, GenerateCommentsBody, GeneratedComments, SummarizeCommentsBody,
};
use crate::models::response::ApiResponse;
use crate::routes::JsonBody;
use crate::services::comments;

/// POST /api/comments/generate
pub async fn generate(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GenerateCommentsBody>,
) -> Result<Json<ApiResponse<GeneratedComments>>, AppError> {
    let result = comments::generate_comments(state.llm.as_ref(), request).await?;
    Ok(Json(ApiResponse::with_message(
        result,
        "Comentarios generados exitosamente",
    )))
}

/// POST /api/comments/summarize
pub async fn summarize(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SummarizeCommentsBody>,
) -> Result<Json<ApiResponse<CommentSummary>>, AppError> {
    let result = comments::summarize_comments(state.llm.as_ref(), request).await?;
    Ok(Json(ApiResponse::with_message(
        result,
        "Comentarios resumidos exitosamente",
    )))
}

/// GET /api/comments/endpoints
pub async fn endpoints() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::ok(json!({
        "title": "API de Comentarios de Productos",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API para generar y resumir comentarios de productos usando IA",
        "endpoints": [
            {
                "method": "POST",
                "path": "/api/comments/generate",
                "description": "Genera comentarios realistas para un producto",
                "required_body": ["productName", "productDescription"],
                "optional_body": ["numberOfComments", "sentiment"],
                "example_body": {
                    "productName": "Smartphone Pro X1",
                    "productDescription": "Teléfono inteligente con cámara de 108MP y batería de 5000mAh",
                    "numberOfComments": 8,
                    "sentiment": "mixed"
                }
            },
            {
                "method": "POST",
                "path": "/api/comments/summarize",
                "description": "Resume y analiza comentarios de productos",
                "required_body": ["productName", "comments"],
                "example_body": {
                    "productName": "Smartphone Pro X1",
                    "comments": [
                        "Excelente producto, muy satisfecho con la compra",
                        {"usuario": "Maria123", "calificacion": 4, "comentario": "Buena calidad pero el precio es un poco alto"}
                    ]
                }
            }
        ],
        "available_sentiments": ["positive", "negative", "mixed"],
        "limits": {
            "max_comments_generate": 20,
            "max_comments_analyze": 100,
            "max_product_name_length": 200,
            "max_description_length": 1000
        }
    })))
}
