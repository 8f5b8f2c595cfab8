use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use crate::models::image::{
    Dimensions, GenerateImagesRequest, GeneratedImage, GenerationStatistics, ImageMetadata,
    ImagePayload, ImageUrls,
};

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const RAW_OUTPUT_PREVIEW_CHARS: usize = 4000;

/// Bridge to the external image generation script.
///
/// Every call spawns one child process. The child is `kill_on_drop`, so a
/// timed-out or abandoned request never leaves it running.
pub struct ImageGenerator {
    interpreter: String,
    script: PathBuf,
    images_dir: PathBuf,
    metadata_dir: PathBuf,
    timeout: Duration,
}

/// What the script reported for a successful run, with images post-processed
/// into inline data URLs or served-file URLs.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub session_id: String,
    pub device: Option<String>,
    pub statistics: GenerationStatistics,
    pub images: Vec<GeneratedImage>,
    pub timestamp: Option<String>,
    pub images_directory: Option<String>,
    pub metadata_file: Option<String>,
}

#[derive(Deserialize)]
struct ScriptData {
    session_id: String,
    #[serde(default)]
    configuracion: Option<ScriptConfig>,
    estadisticas: ScriptStatistics,
    #[serde(default)]
    imagenes: Vec<ScriptImage>,
    #[serde(default)]
    archivos: Option<ScriptFiles>,
}

#[derive(Deserialize)]
struct ScriptConfig {
    #[serde(default)]
    dispositivo: Option<String>,
}

#[derive(Deserialize)]
struct ScriptStatistics {
    #[serde(default)]
    total_generadas: u32,
    #[serde(default)]
    total_fallidas: u32,
    #[serde(default)]
    tasa_exito: f64,
}

#[derive(Deserialize)]
struct ScriptFiles {
    #[serde(default)]
    directorio_imagenes: Option<String>,
    #[serde(default)]
    archivo_metadata: Option<String>,
}

#[derive(Deserialize)]
struct ScriptImage {
    id: String,
    variacion: u32,
    nombre_archivo: String,
    #[serde(default)]
    formato: Option<String>,
    #[serde(default)]
    base64_data: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    metadata: ScriptImageMetadata,
}

#[derive(Deserialize, Default)]
struct ScriptImageMetadata {
    #[serde(default)]
    hash_sha256: String,
    #[serde(default)]
    tamano_bytes: u64,
    #[serde(default)]
    dimensiones: Option<Dimensions>,
    #[serde(default)]
    timestamp_generacion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpreterStatus {
    pub available: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptStatus {
    pub exists: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyStatus {
    pub requirements_found: bool,
    pub requirements_path: PathBuf,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputDirectories {
    pub images: PathBuf,
    pub metadata: PathBuf,
}

/// Readiness of the generator: interpreter, script and declared dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub interpreter: InterpreterStatus,
    pub script: ScriptStatus,
    pub dependencies: DependencyStatus,
    pub directories: OutputDirectories,
    pub ready: bool,
}

impl ServiceStatus {
    /// Human-readable list of whatever keeps the service from being ready.
    pub fn missing_components(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.interpreter.available {
            missing.push(format!(
                "Intérprete no disponible ({}): {}",
                self.interpreter.command,
                self.interpreter
                    .error
                    .as_deref()
                    .unwrap_or("comando no encontrado")
            ));
        }
        if !self.script.exists {
            missing.push(format!(
                "Script no encontrado: {}",
                self.script.path.display()
            ));
        }
        if !self.dependencies.requirements_found {
            missing.push("Archivo requirements.txt no encontrado".to_string());
        }
        missing
    }
}

/// Make a configured path independent of the child's working directory.
fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(RAW_OUTPUT_PREVIEW_CHARS).collect()
}

/// Declared packages from a requirements file: blank, comment and option
/// lines are skipped.
pub fn parse_requirements(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(str::to_string)
        .collect()
}

impl ImageGenerator {
    pub fn new(
        interpreter: impl Into<String>,
        script: impl Into<PathBuf>,
        images_dir: impl Into<PathBuf>,
        metadata_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: absolute(script.into()),
            images_dir: absolute(images_dir.into()),
            metadata_dir: absolute(metadata_dir.into()),
            timeout,
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn working_dir(&self) -> &Path {
        match self.script.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn requirements_path(&self) -> PathBuf {
        self.working_dir().join("requirements.txt")
    }

    /// Command-line arguments in the order the script expects them.
    pub fn arguments(&self, request: &GenerateImagesRequest) -> Vec<OsString> {
        vec![
            self.script.clone().into_os_string(),
            "--producto".into(),
            request.product_name.clone().into(),
            "--descripcion".into(),
            request.product_description.clone().into(),
            "--estilo".into(),
            request.style.to_string().into(),
            "--variaciones".into(),
            request.variations.to_string().into(),
            "--width".into(),
            request.width.to_string().into(),
            "--height".into(),
            request.height.to_string().into(),
            "--pasos".into(),
            request.inference_steps.to_string().into(),
            "--guidance".into(),
            request.guidance_scale.to_string().into(),
            "--quiet".into(),
        ]
    }

    /// Run the script once and translate its stdout into a typed outcome.
    pub async fn generate(
        &self,
        request: &GenerateImagesRequest,
    ) -> Result<GenerationOutcome, GeneratorError> {
        let mut command = Command::new(&self.interpreter);
        command
            .args(self.arguments(request))
            .current_dir(self.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            interpreter = %self.interpreter,
            script = %self.script.display(),
            product = %request.product_name,
            style = %request.style,
            variations = request.variations,
            "Spawning image generator"
        );

        let start = Instant::now();
        let child = command.spawn().map_err(GeneratorError::Execution)?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(GeneratorError::Execution)?,
            Err(_) => {
                metrics::counter!("image_generation_total", "outcome" => "timeout").increment(1);
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Image generator timed out, child killed"
                );
                return Err(GeneratorError::Timeout {
                    after: self.timeout,
                });
            }
        };

        metrics::histogram!("image_generation_seconds").record(start.elapsed().as_secs_f64());

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!(target: "image_generator", "{line}");
        }

        if !output.status.success() {
            metrics::counter!("image_generation_total", "outcome" => "exit_error").increment(1);
            tracing::error!(
                code = ?output.status.code(),
                stderr_len = stderr.len(),
                "Image generator exited with failure"
            );
            return Err(GeneratorError::NonZeroExit {
                code: output.status.code(),
                stderr,
                stdout: preview(&stdout),
            });
        }

        let outcome = parse_output(&stdout);
        let label = match &outcome {
            Ok(_) => "success",
            Err(GeneratorError::Reported { .. }) => "reported_error",
            Err(_) => "parse_error",
        };
        metrics::counter!("image_generation_total", "outcome" => label).increment(1);

        if let Ok(result) = &outcome {
            tracing::info!(
                session_id = %result.session_id,
                generated = result.statistics.total_generated,
                failed = result.statistics.total_failed,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Image generation completed"
            );
        }

        outcome
    }

    /// Interpreter, script and requirements checks, run concurrently.
    pub async fn status(&self) -> ServiceStatus {
        let (interpreter, script_exists, dependencies) = tokio::join!(
            self.check_interpreter(),
            self.check_script(),
            self.check_dependencies()
        );

        let ready = interpreter.available && script_exists && dependencies.requirements_found;

        ServiceStatus {
            interpreter,
            script: ScriptStatus {
                exists: script_exists,
                path: self.script.clone(),
            },
            dependencies,
            directories: OutputDirectories {
                images: self.images_dir.clone(),
                metadata: self.metadata_dir.clone(),
            },
            ready,
        }
    }

    async fn check_interpreter(&self) -> InterpreterStatus {
        let mut command = Command::new(&self.interpreter);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = timeout(VERSION_CHECK_TIMEOUT, command.output()).await;
        match result {
            Ok(Ok(output)) => {
                // Older interpreters print the version on stderr.
                let mut version = String::from_utf8_lossy(&output.stdout).into_owned();
                version.push_str(&String::from_utf8_lossy(&output.stderr));
                InterpreterStatus {
                    available: output.status.success(),
                    command: self.interpreter.clone(),
                    version: Some(version.trim().to_string()).filter(|v| !v.is_empty()),
                    error: None,
                }
            }
            Ok(Err(e)) => InterpreterStatus {
                available: false,
                command: self.interpreter.clone(),
                version: None,
                error: Some(e.to_string()),
            },
            Err(_) => InterpreterStatus {
                available: false,
                command: self.interpreter.clone(),
                version: None,
                error: Some("version check timed out".to_string()),
            },
        }
    }

    async fn check_script(&self) -> bool {
        match tokio::fs::File::open(&self.script).await {
            Ok(file) => file
                .metadata()
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!(path = %self.script.display(), error = %e, "Generator script not readable");
                false
            }
        }
    }

    async fn check_dependencies(&self) -> DependencyStatus {
        let path = self.requirements_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => DependencyStatus {
                requirements_found: true,
                dependencies: parse_requirements(&contents),
                install_command: Some(format!("pip install -r {}", path.display())),
                requirements_path: path,
                error: None,
            },
            Err(e) => DependencyStatus {
                requirements_found: false,
                requirements_path: path,
                dependencies: Vec::new(),
                install_command: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Parse the script's stdout: JSON first, then the `exito` flag, then the
/// typed payload.
fn parse_output(stdout: &str) -> Result<GenerationOutcome, GeneratorError> {
    let value: Value = serde_json::from_str(stdout.trim()).map_err(|e| GeneratorError::Parse {
        error: e.to_string(),
        raw_output: preview(stdout),
    })?;

    if value.get("exito").and_then(Value::as_bool) != Some(true) {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("UnknownGeneratorError")
            .to_string();
        let message = value
            .get("mensaje")
            .and_then(Value::as_str)
            .unwrap_or("Error desconocido en el generador de imágenes")
            .to_string();
        return Err(GeneratorError::Reported {
            error,
            message,
            payload: value,
        });
    }

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);

    let data_value = value.get("datos").cloned().unwrap_or(Value::Null);
    let data: ScriptData =
        serde_json::from_value(data_value).map_err(|e| GeneratorError::Parse {
            error: format!("unexpected generator payload: {e}"),
            raw_output: preview(stdout),
        })?;

    let images = data
        .imagenes
        .into_iter()
        .map(|image| shape_image(image, stdout))
        .collect::<Result<Vec<_>, _>>()?;

    let files = data.archivos.unwrap_or(ScriptFiles {
        directorio_imagenes: None,
        archivo_metadata: None,
    });

    Ok(GenerationOutcome {
        session_id: data.session_id,
        device: data.configuracion.and_then(|c| c.dispositivo),
        statistics: GenerationStatistics {
            total_generated: data.estadisticas.total_generadas,
            total_failed: data.estadisticas.total_fallidas,
            success_rate: data.estadisticas.tasa_exito,
        },
        images,
        timestamp,
        images_directory: files.directorio_imagenes,
        metadata_file: files.archivo_metadata.filter(|f| !f.is_empty()),
    })
}

fn shape_image(image: ScriptImage, stdout: &str) -> Result<GeneratedImage, GeneratorError> {
    let inline = image.formato.as_deref() == Some("base64");
    let mut size_bytes = image.metadata.tamano_bytes;

    let payload = if inline {
        let encoded = image.base64_data.unwrap_or_default();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| GeneratorError::Parse {
                error: format!("image {} carries an invalid base64 payload: {e}", image.id),
                raw_output: preview(stdout),
            })?;
        if size_bytes == 0 {
            size_bytes = decoded.len() as u64;
        }
        let mime_type = image
            .mime_type
            .unwrap_or_else(|| "image/png".to_string());
        ImagePayload::Inline {
            data_url: format!("data:{mime_type};base64,{encoded}"),
            mime_type,
            size_mb: (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        }
    } else {
        ImagePayload::File {
            urls: ImageUrls::for_image(&image.nombre_archivo, &image.id),
        }
    };

    Ok(GeneratedImage {
        id: image.id,
        variation: image.variacion,
        filename: image.nombre_archivo,
        payload,
        display_ready: inline,
        metadata: ImageMetadata {
            hash: image.metadata.hash_sha256,
            size_bytes,
            dimensions: image.metadata.dimensiones,
            timestamp: image.metadata.timestamp_generacion,
        },
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Failed to run image generator: {0}")]
    Execution(#[source] std::io::Error),

    #[error("Image generator exited with code {code:?}")]
    NonZeroExit {
        code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    #[error("Image generator output is not valid JSON: {error}")]
    Parse { error: String, raw_output: String },

    #[error("Image generator reported {error}: {message}")]
    Reported {
        error: String,
        message: String,
        payload: Value,
    },

    #[error("Image generation exceeded {after:?}")]
    Timeout { after: Duration },
}
