//! Router-level tests: every route is driven through `tower::ServiceExt::oneshot`
//! against a stub chat model and scratch generator directories.
//!
//! Run with: cargo test --test integration_test

mod fixtures;
mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use fixtures::*;
use helpers::*;
use serde_json::{json, Value};
use tower::ServiceExt;

#[tokio::test]
async fn test_descriptions_drop_malformed_proposals() {
    let dir = tempfile::tempdir().unwrap();
    let (model, requests) = StubChatModel::new(StubReply::Text(DESCRIPTIONS_FENCED.reply));
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/chat/generate-detailed-product-info",
        Some(json!({"productName": "  Lámpara Solar  ", "numberOfProposals": 3})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", DESCRIPTIONS_FENCED.description);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["product_name"], "Lámpara Solar");
    assert_eq!(body["data"]["total_proposals"], 2);
    let proposals = body["data"]["proposals"].as_array().unwrap();
    assert!(proposals
        .iter()
        .all(|p| p["titulo"].is_string() && p["descripcion_comercial"].is_string()));
    assert_eq!(body["data"]["usage"]["total_tokens"], 200);

    let sent = requests.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].user.contains("Lámpara Solar"));
}

#[tokio::test]
async fn test_descriptions_unparseable_reply_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(
        StubChatModel::replying(DESCRIPTIONS_NOT_JSON.reply),
        dir.path(),
    );

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/chat/generate-detailed-product-info",
        Some(json!({"productName": "Lámpara Solar"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UpstreamParseError");
    assert!(body["details"]["rawResponse"]
        .as_str()
        .unwrap()
        .contains("Lámpara Solar Aurora"));
}

#[tokio::test]
async fn test_validation_reports_every_violation_without_calling_model() {
    let dir = tempfile::tempdir().unwrap();
    let (model, requests) = StubChatModel::new(StubReply::Text(COMMENTS_WITH_PROSE.reply));
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/comments/generate",
        Some(json!({
            "productName": "X",
            "productDescription": "corta",
            "numberOfComments": 0,
            "sentiment": "furious"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "ValidationError");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields.len(), 4);
    assert!(fields.contains(&"sentiment"));
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_and_mistyped_fields_are_reported_together() {
    let dir = tempfile::tempdir().unwrap();
    let (model, requests) = StubChatModel::new(StubReply::Text(COMMENTS_WITH_PROSE.reply));
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/comments/generate",
        Some(json!({
            "productDescription": "Café de altura tostado medio",
            "numberOfComments": -1,
            "sentiment": "furious"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    let violations = body["details"].as_array().unwrap();
    let fields: Vec<&str> = violations
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields.len(), 3, "{:?}", violations);
    assert!(fields.contains(&"product_name"));
    assert!(fields.contains(&"number_of_comments"));
    assert!(fields.contains(&"sentiment"));
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_typed_image_fields_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(StubChatModel::replying("[]"), dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/images/generate",
        Some(json!({
            "productName": "Chocolate Premium",
            "productDescription": "Chocolate artesanal 70% cacao",
            "variations": "tres",
            "width": 4096
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_json_body_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(StubChatModel::replying("[]"), dir.path());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/comments/summarize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"productName\": "))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_generate_comments_recovers_array_from_prose() {
    let dir = tempfile::tempdir().unwrap();
    let (model, requests) = StubChatModel::new(StubReply::Text(COMMENTS_WITH_PROSE.reply));
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/comments/generate",
        Some(json!({
            "productName": "Café Molido",
            "productDescription": "Café de altura tostado medio",
            "numberOfComments": 2,
            "sentiment": "positive"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", COMMENTS_WITH_PROSE.description);
    assert_eq!(body["message"], "Comentarios generados exitosamente");
    assert_eq!(body["data"]["total_comments"], 2);
    assert_eq!(body["data"]["sentiment_type"], "positive");
    assert_eq!(body["data"]["comments"][0]["usuario"], "CafeLover_88");

    let sent = requests.lock().unwrap();
    assert_eq!(sent[0].temperature, Some(0.8));
    assert!(sent[0].user.contains("mayormente positivos"));
}

#[tokio::test]
async fn test_summarize_prefers_computed_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let (model, requests) = StubChatModel::new(StubReply::Text(SUMMARY_OVERCONFIDENT.reply));
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/comments/summarize",
        Some(json!({
            "productName": "Café Molido",
            "comments": [
                {"usuario": "A", "calificacion": 5, "comentario": "Excelente", "util": 4},
                {"usuario": "B", "rating": "5", "comentario": "Muy bueno"},
                {"usuario": "C", "score": 4, "comentario": "Bueno", "helpful": 2},
                {"usuario": "D", "calificacion": 1, "comentario": "Amargo"},
                "Horrible, 1 estrella",
                "Llegó en 5 días"
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", SUMMARY_OVERCONFIDENT.description);
    let data = &body["data"];
    assert_eq!(data["total_comments_analyzed"], 6);
    assert!(data["analysis_timestamp"].as_str().unwrap().ends_with('Z'));

    let summary = &data["summary"];
    assert_eq!(summary["calificacion_promedio"], json!(3.2));
    assert_eq!(summary["sentiment_general"], "mixed");
    assert_eq!(summary["aspectos_negativos"][0], "Amargor");

    let detail = &summary["estadisticas_detalladas"];
    assert_eq!(detail["total_calificaciones"], 5);
    assert_eq!(detail["total_votos_utiles"], 6);
    assert_eq!(detail["porcentaje_con_calificacion"], 83);
    assert_eq!(
        detail["distribucion_calificaciones"],
        json!({"1": 2, "2": 0, "3": 0, "4": 1, "5": 2})
    );

    let sent = requests.lock().unwrap();
    assert_eq!(sent[0].temperature, Some(0.3));
    assert!(sent[0].system.contains("3.2/5 basada en 5 calificaciones"));
}

#[tokio::test]
async fn test_summarize_rejects_non_object_reply() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(StubChatModel::replying(SUMMARY_AS_ARRAY.reply), dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/comments/summarize",
        Some(json!({"productName": "Café Molido", "comments": ["Rico"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UpstreamParseError");
}

#[tokio::test]
async fn test_llm_failure_is_llm_service_error() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = StubChatModel::new(StubReply::Unavailable);
    let router = test_router(model, dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/chat/generate-detailed-product-info",
        Some(json!({"productName": "Lámpara Solar"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "LlmServiceError");
}

#[tokio::test]
async fn test_image_generation_when_generator_missing() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(StubChatModel::replying("[]"), dir.path());

    let (status, body) = send_json(
        router,
        Method::POST,
        "/api/images/generate",
        Some(json!({
            "productName": "Chocolate Premium",
            "productDescription": "Chocolate artesanal 70% cacao",
            "style": "premium"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ServiceNotReady");
    assert_eq!(body["details"]["missingComponents"].as_array().unwrap().len(), 3);
    assert_eq!(body["details"]["serviceStatus"]["ready"], false);
}

#[tokio::test]
async fn test_service_status_and_health_report_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(StubChatModel::replying("[]"), dir.path());

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/service/status",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["service_ready"], false);
    assert_eq!(body["data"]["interpreter"]["available"], false);
    assert_eq!(body["data"]["recommendations"].as_array().unwrap().len(), 3);

    let (status, body) = send_json(
        product_content_api::routes::api_router(state),
        Method::GET,
        "/health",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["llm"]["status"], "ok");
    assert_eq!(body["checks"]["image_generator"]["status"], "error");
}

#[tokio::test]
async fn test_styles_and_endpoint_docs() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(StubChatModel::replying("[]"), dir.path());

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/styles",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["default_style"], "profesional");
    assert_eq!(body["data"]["styles"].as_array().unwrap().len(), 12);
    assert_eq!(body["data"]["styles"][1]["name"], "Artístico");

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/endpoints",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["timeout_seconds"], 5);

    let (status, body) = send_json(
        product_content_api::routes::api_router(state),
        Method::GET,
        "/api/comments/endpoints",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limits"]["max_comments_analyze"], 100);
}

fn seed_session(root: &std::path::Path) {
    let session = json!({
        "session_id": "abcd1234",
        "timestamp": "2025-03-01T10:00:00",
        "producto": {"nombre": "Chocolate Premium", "descripcion": "70% cacao", "tipo": "consumible"},
        "parametros": {"estilo": "premium", "num_variaciones": 3, "dimensiones": {"width": 768, "height": 768}},
        "imagenes": [
            {"variacion": 1, "nombre_archivo": "choco_01.png", "exito": true, "tamano_archivo": 12, "timestamp_generacion": "2025-03-01T10:00:01"},
            {"variacion": 2, "nombre_archivo": "choco_02.png", "exito": true, "tamano_archivo": 12, "timestamp_generacion": "2025-03-01T10:00:02"},
            {"variacion": 3, "nombre_archivo": "choco_03.png", "exito": false}
        ]
    });
    std::fs::write(
        root.join("metadata").join("sesion_abcd1234.json"),
        session.to_string(),
    )
    .unwrap();
    std::fs::write(
        root.join("imagenes").join("choco_01.png"),
        b"\x89PNG\r\n\x1a\nfake",
    )
    .unwrap();
}

#[tokio::test]
async fn test_image_listing_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(StubChatModel::replying("[]"), dir.path());
    seed_session(dir.path());

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/list?page=1&limit=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["images"][0]["id"], "abcd1234_02");
    assert_eq!(body["data"]["pagination"]["total_items"], 2);
    assert_eq!(body["data"]["pagination"]["has_next"], true);

    let (status, _) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/list?limit=500",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/metadata/abcd1234_01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["image_details"]["nombre_archivo"], "choco_01.png");

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/metadata/abcd1234_09",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ImageMetadataNotFound");

    let (status, body) = send_json(
        product_content_api::routes::api_router(state.clone()),
        Method::GET,
        "/api/images/metadata/zzzz9999_01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "MetadataNotFound");

    let (status, body) = send_json(
        product_content_api::routes::api_router(state),
        Method::GET,
        "/api/images/metadata/bad_01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidImageId");
}

#[tokio::test]
async fn test_serve_and_download_headers() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(StubChatModel::replying("[]"), dir.path());
    seed_session(dir.path());

    let response = product_content_api::routes::api_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/images/serve/choco_01.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers[header::ETAG], "\"choco_01.png\"");

    let response = product_content_api::routes::api_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/images/download/choco_01.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"choco_01.png\""
    );

    let (status, body) = send_json(
        product_content_api::routes::api_router(state),
        Method::GET,
        "/api/images/serve/choco_02.png",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ImageNotFound");
}

#[tokio::test]
async fn test_serve_refuses_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(StubChatModel::replying("[]"), dir.path());
    std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();

    // %2F keeps the separator inside the single path segment.
    let (status, body) = send_json(
        router,
        Method::GET,
        "/api/images/serve/..%2Fsecret.txt",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AccessDenied");
}
