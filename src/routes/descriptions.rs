use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::description::{DescriptionBody, DescriptionResult};
use crate::models::response::ApiResponse;
use crate::routes::JsonBody;
use crate::services::descriptions;

/// POST /api/chat/generate-detailed-product-info
pub async fn generate_detailed_product_info(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<DescriptionBody>,
) -> Result<Json<ApiResponse<DescriptionResult>>, AppError> {
    let result = descriptions::generate_descriptions(state.llm.as_ref(), request).await?;
    Ok(Json(ApiResponse::with_message(
        result,
        "Propuestas generadas exitosamente",
    )))
}
