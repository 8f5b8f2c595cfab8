use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::models::response::{ErrorBody, FieldViolation};
use crate::services::extraction::ExtractionFailure;
use crate::services::generator::GeneratorError;
use crate::services::image_store::ImageStoreError;
use crate::services::llm::LlmError;

/// Every failure a route can return, rendered once as the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Errores de validación en los datos de entrada")]
    Validation(Vec<FieldViolation>),

    #[error("{message}")]
    UpstreamParse { message: String, raw_output: String },

    #[error("El servicio de generación de imágenes no está listo")]
    ServiceNotReady {
        missing: Vec<String>,
        suggestions: Vec<String>,
        status: Value,
    },

    #[error("La solicitud al modelo tomó demasiado tiempo")]
    Timeout,

    #[error("Error comunicándose con el modelo de lenguaje")]
    Llm(#[source] LlmError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("La imagen solicitada no fue encontrada")]
    ImageNotFound(String),

    #[error("Metadata de la sesión no encontrada")]
    MetadataNotFound(String),

    #[error("La sesión existe pero no contiene la imagen solicitada")]
    ImageMetadataNotFound(String),

    #[error("ID de imagen inválido")]
    InvalidImageId(String),

    #[error("Acceso denegado al archivo solicitado")]
    AccessDenied,

    #[error("Error inesperado procesando la solicitud")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Stable category string sent as `error`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::UpstreamParse { .. } => "UpstreamParseError",
            AppError::ServiceNotReady { .. } => "ServiceNotReady",
            AppError::Timeout => "TimeoutError",
            AppError::Llm(_) => "LlmServiceError",
            AppError::Generator(e) => match e {
                GeneratorError::Execution(_) => "GeneratorExecutionError",
                GeneratorError::NonZeroExit { .. } => "GeneratorExitError",
                GeneratorError::Parse { .. } => "UpstreamParseError",
                GeneratorError::Reported { .. } => "GeneratorReportedError",
                GeneratorError::Timeout { .. } => "TimeoutError",
            },
            AppError::ImageNotFound(_) => "ImageNotFound",
            AppError::MetadataNotFound(_) => "MetadataNotFound",
            AppError::ImageMetadataNotFound(_) => "ImageMetadataNotFound",
            AppError::InvalidImageId(_) => "InvalidImageId",
            AppError::AccessDenied => "AccessDenied",
            AppError::Unexpected(_) => "UnexpectedError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidImageId(_) => StatusCode::BAD_REQUEST,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::ImageNotFound(_)
            | AppError::MetadataNotFound(_)
            | AppError::ImageMetadataNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamParse { .. } | AppError::Llm(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceNotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Generator(e) => match e {
                GeneratorError::Parse { .. } => StatusCode::BAD_GATEWAY,
                GeneratorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Generator(e) => match e {
                GeneratorError::Execution(e) => {
                    format!("Error ejecutando el generador de imágenes: {e}")
                }
                GeneratorError::NonZeroExit { code, .. } => format!(
                    "El generador de imágenes terminó con código de error: {}",
                    code.map(|c| c.to_string()).unwrap_or_else(|| "señal".to_string())
                ),
                GeneratorError::Parse { .. } => {
                    "No se pudo interpretar la respuesta del generador de imágenes".to_string()
                }
                GeneratorError::Reported { message, .. } => message.clone(),
                GeneratorError::Timeout { after } => format!(
                    "La generación de imágenes tomó demasiado tiempo (timeout: {} segundos)",
                    after.as_secs()
                ),
            },
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(violations) => Some(json!(violations)),
            AppError::UpstreamParse { raw_output, .. } => {
                Some(json!({ "rawResponse": raw_output }))
            }
            AppError::ServiceNotReady {
                missing,
                suggestions,
                status,
            } => Some(json!({
                "missingComponents": missing,
                "suggestions": suggestions,
                "serviceStatus": status,
            })),
            AppError::Llm(e) => Some(json!({ "reason": e.to_string() })),
            AppError::Generator(e) => match e {
                GeneratorError::Execution(e) => Some(json!({ "reason": e.to_string() })),
                GeneratorError::NonZeroExit {
                    code,
                    stderr,
                    stdout,
                } => Some(json!({ "exitCode": code, "stderr": stderr, "stdout": stdout })),
                GeneratorError::Parse { error, raw_output } => {
                    Some(json!({ "parseError": error, "rawOutput": raw_output }))
                }
                GeneratorError::Reported { error, payload, .. } => {
                    Some(json!({ "generatorError": error, "payload": payload }))
                }
                GeneratorError::Timeout { .. } => None,
            },
            AppError::ImageNotFound(filename) => Some(json!({ "filename": filename })),
            AppError::MetadataNotFound(id)
            | AppError::ImageMetadataNotFound(id)
            | AppError::InvalidImageId(id) => Some(json!({ "id": id })),
            AppError::Timeout | AppError::AccessDenied | AppError::Unexpected(_) => None,
        }
    }
}

impl From<LlmError> for AppError {
    fn from(error: LlmError) -> Self {
        match &error {
            LlmError::Http(e) if e.is_timeout() => AppError::Timeout,
            _ => AppError::Llm(error),
        }
    }
}

impl From<ExtractionFailure> for AppError {
    fn from(failure: ExtractionFailure) -> Self {
        AppError::UpstreamParse {
            message: "La respuesta del modelo no contiene JSON válido".to_string(),
            raw_output: failure.raw_response,
        }
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(FieldViolation::from_report(&report))
    }
}

impl From<ImageStoreError> for AppError {
    fn from(error: ImageStoreError) -> Self {
        match error {
            ImageStoreError::InvalidImageId(id) => AppError::InvalidImageId(id),
            ImageStoreError::MetadataNotFound(id) => AppError::MetadataNotFound(id),
            ImageStoreError::ImageMetadataNotFound(id) => AppError::ImageMetadataNotFound(id),
            ImageStoreError::ImageNotFound(name) => AppError::ImageNotFound(name),
            ImageStoreError::AccessDenied => AppError::AccessDenied,
            ImageStoreError::Io(e) => AppError::Unexpected(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            match &self {
                AppError::Unexpected(inner) => {
                    tracing::error!(error = code, detail = %inner, "Unexpected error")
                }
                other => tracing::error!(error = code, detail = %other, "Request failed"),
            }
        } else {
            tracing::warn!(error = code, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: code,
            message: self.message(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}
