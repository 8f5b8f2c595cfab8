use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Install the global Prometheus recorder and describe the application metrics.
pub fn install_recorder() -> Result<Arc<PrometheusHandle>, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_histogram!(
        "llm_request_seconds",
        "Latency of chat completion calls to the LLM backend"
    );
    metrics::describe_counter!(
        "json_extraction_total",
        "JSON extractions from model output, labelled by the tier that succeeded"
    );
    metrics::describe_counter!(
        "descriptions_generated_total",
        "Product description proposals returned to clients"
    );
    metrics::describe_counter!(
        "comments_generated_total",
        "Synthetic product comments returned to clients"
    );
    metrics::describe_counter!("comment_summaries_total", "Comment summaries produced");
    metrics::describe_histogram!(
        "image_generation_seconds",
        "Wall-clock duration of image generator runs"
    );
    metrics::describe_counter!(
        "image_generation_total",
        "Image generator runs, labelled by outcome"
    );
    metrics::describe_counter!("image_downloads_total", "Generated images downloaded");

    Ok(Arc::new(handle))
}

/// Prometheus scrape endpoint in text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// `/metrics` route with its own state, merged beside the API router.
pub fn router(handle: Arc<PrometheusHandle>) -> Router {
    Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(handle)
}
