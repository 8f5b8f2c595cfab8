use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub llm: ComponentHealth,
    pub image_generator: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn ok(start: Instant) -> Self {
        Self {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            status: "error".to_string(),
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// GET /health: LLM backend reachability and image generator readiness.
/// Both checks run concurrently, so they share one latency figure.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = Instant::now();
    let (llm, generator) = tokio::join!(state.llm.health_check(), state.generator.status());

    let llm_check = match llm {
        Ok(()) => ComponentHealth::ok(start),
        Err(e) => ComponentHealth::failed(e.to_string()),
    };

    let generator_check = if generator.ready {
        ComponentHealth::ok(start)
    } else {
        ComponentHealth::failed(generator.missing_components().join("; "))
    };

    let all_healthy = llm_check.status == "ok" && generator_check.status == "ok";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            llm: llm_check,
            image_generator: generator_check,
        },
    };

    (status_code, Json(response))
}
