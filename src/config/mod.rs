use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the OpenAI-compatible API (Ollama exposes it under `/v1`).
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,

    /// Chat model served by the LLM backend
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Bearer token sent to the LLM backend. Ollama ignores it but requires one.
    #[serde(default = "default_llm_api_key")]
    pub llm_api_key: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Interpreter used to run the image generator script
    #[serde(default = "default_generator_interpreter")]
    pub generator_interpreter: String,

    /// Path to the image generator CLI script
    #[serde(default = "default_generator_script")]
    pub generator_script: PathBuf,

    /// Directory the generator writes image files into
    #[serde(default = "default_generator_images_dir")]
    pub generator_images_dir: PathBuf,

    /// Directory the generator writes `sesion_<id>.json` files into
    #[serde(default = "default_generator_metadata_dir")]
    pub generator_metadata_dir: PathBuf,

    /// Wall-clock ceiling for a single generator run
    #[serde(default = "default_generator_timeout_secs")]
    pub generator_timeout_secs: u64,

    /// Maximum accepted request body size
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_llm_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model_name() -> String {
    "gemma3:1b".to_string()
}

fn default_llm_api_key() -> String {
    "ollama".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_generator_interpreter() -> String {
    "python".to_string()
}

fn default_generator_script() -> PathBuf {
    PathBuf::from("python_image_generator/generar_cli.py")
}

fn default_generator_images_dir() -> PathBuf {
    PathBuf::from("python_image_generator/imagenes_consumibles")
}

fn default_generator_metadata_dir() -> PathBuf {
    PathBuf::from("python_image_generator/metadata")
}

fn default_generator_timeout_secs() -> u64 {
    300
}

fn default_body_limit_bytes() -> usize {
    2 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}
