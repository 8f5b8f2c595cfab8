use serde::Serialize;

use crate::error::AppError;
use crate::models::image::{
    Dimensions, GenerateImagesBody, GenerationConfig, GenerationFiles, ImageGenerationReport,
    ImagePayload, ProductInfo, StyleCatalog,
};
use crate::services::generator::{
    DependencyStatus, ImageGenerator, InterpreterStatus, OutputDirectories, ScriptStatus,
    ServiceStatus,
};

const PRODUCT_KIND: &str = "consumible";

const NOT_READY_SUGGESTIONS: [&str; 3] = [
    "Verificar que el intérprete esté instalado y en el PATH",
    "Verificar que el script del generador exista",
    "Instalar dependencias: pip install -r requirements.txt",
];

/// `data` of GET /api/images/service/status.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub service_ready: bool,
    pub interpreter: InterpreterStatus,
    pub script: ScriptStatus,
    pub dependencies: DependencyStatus,
    pub directories: OutputDirectories,
    pub recommendations: Vec<String>,
}

impl From<ServiceStatus> for ServiceReport {
    fn from(status: ServiceStatus) -> Self {
        let recommendations = if status.ready {
            vec!["El servicio está listo para generar imágenes".to_string()]
        } else {
            let install = status
                .dependencies
                .install_command
                .clone()
                .unwrap_or_else(|| "pip install -r requirements.txt".to_string());
            vec![
                "Instalar el intérprete si no está disponible".to_string(),
                "Verificar que el script del generador exista".to_string(),
                format!("Instalar dependencias: {install}"),
            ]
        };

        Self {
            service_ready: status.ready,
            interpreter: status.interpreter,
            script: status.script,
            dependencies: status.dependencies,
            directories: status.directories,
            recommendations,
        }
    }
}

pub fn styles() -> StyleCatalog {
    StyleCatalog::all()
}

pub async fn service_report(generator: &ImageGenerator) -> ServiceReport {
    generator.status().await.into()
}

/// Generate product images. Returns the report and the user-facing message.
pub async fn generate_images(
    generator: &ImageGenerator,
    body: GenerateImagesBody,
) -> Result<(ImageGenerationReport, String), AppError> {
    let request = body.into_request()?;

    let status = generator.status().await;
    if !status.ready {
        let missing = status.missing_components();
        tracing::warn!(?missing, "Image generation requested while service not ready");
        return Err(AppError::ServiceNotReady {
            missing,
            suggestions: NOT_READY_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            status: serde_json::to_value(&status).unwrap_or_default(),
        });
    }

    let outcome = generator.generate(&request).await?;

    let format = match outcome.images.first().map(|i| &i.payload) {
        Some(ImagePayload::Inline { .. }) => "base64",
        Some(ImagePayload::File { .. }) => "archivo",
        None => "unknown",
    };

    let message = format!(
        "Se generaron {} imágenes exitosamente",
        outcome.statistics.total_generated
    );

    let report = ImageGenerationReport {
        session_id: outcome.session_id,
        generation_config: GenerationConfig {
            style: request.style,
            variations_requested: request.variations,
            dimensions: Dimensions {
                width: request.width,
                height: request.height,
            },
            inference_steps: request.inference_steps,
            guidance_scale: request.guidance_scale,
            device: outcome.device,
        },
        product: ProductInfo {
            name: request.product_name,
            description: request.product_description,
            kind: PRODUCT_KIND.to_string(),
        },
        statistics: outcome.statistics,
        images: outcome.images,
        metadata: GenerationFiles {
            generation_timestamp: outcome.timestamp,
            images_directory: outcome.images_directory,
            metadata_file: outcome.metadata_file,
            format: format.to_string(),
        },
    };

    Ok((report, message))
}
