use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use product_content_api::app_state::AppState;
use product_content_api::config::AppConfig;
use product_content_api::routes;
use product_content_api::services::{
    generator::ImageGenerator, image_store::ImageStore, llm::OpenAiCompatibleClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing product-content-api server");

    let prometheus_handle =
        routes::metrics::install_recorder().expect("Failed to install Prometheus metrics recorder");

    tracing::info!(
        base_url = %config.llm_base_url,
        model = %config.model_name,
        "Initializing LLM client"
    );
    let llm = OpenAiCompatibleClient::new(
        &config.llm_base_url,
        &config.model_name,
        &config.llm_api_key,
        config.llm_timeout(),
    )
    .expect("Failed to initialize LLM client");

    let generator = ImageGenerator::new(
        config.generator_interpreter.clone(),
        config.generator_script.clone(),
        config.generator_images_dir.clone(),
        config.generator_metadata_dir.clone(),
        config.generator_timeout(),
    );
    let images = ImageStore::new(generator.images_dir(), generator.metadata_dir());

    let status = generator.status().await;
    if status.ready {
        tracing::info!(
            interpreter = ?status.interpreter.version,
            "Image generator ready"
        );
    } else {
        tracing::warn!(
            missing = ?status.missing_components(),
            "Image generator not ready; image generation requests will return 503"
        );
    }

    let state = AppState::new(llm, generator, images);

    let app = routes::api_router(state)
        .merge(routes::metrics::router(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

    tracing::info!("Starting product-content-api on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
