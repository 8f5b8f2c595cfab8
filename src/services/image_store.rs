//! Read-only view over the generator's output directories: session metadata
//! files and the image files they reference.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

use crate::models::image::{
    Dimensions, ImageListItem, ImageListQuery, ImageListing, ImageMetadataView, ImageUrls,
    ListFilters, Pagination,
};

const SESSION_ID_LEN: usize = 8;

/// Per-session file written by the generator as `sesion_<id>.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub producto: Value,
    #[serde(default)]
    pub parametros: Value,
    #[serde(default)]
    pub imagenes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SessionImage {
    variacion: u32,
    nombre_archivo: String,
    #[serde(default)]
    exito: bool,
    #[serde(default)]
    timestamp_generacion: Option<String>,
    #[serde(default)]
    dimensiones: Option<Dimensions>,
    #[serde(default)]
    tamano_archivo: Option<u64>,
}

impl SessionMetadata {
    fn product_name(&self) -> String {
        self.producto
            .get("nombre")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn style(&self) -> Option<String> {
        self.parametros
            .get("estilo")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub fn image_id(session_id: &str, variation: u32) -> String {
    format!("{session_id}_{variation:02}")
}

/// A file ready to be streamed back to the client.
#[derive(Debug)]
pub struct StoredImage {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

pub struct ImageStore {
    images_dir: PathBuf,
    metadata_dir: PathBuf,
}

/// Sort key for generation timestamps; accepts RFC 3339 and naive ISO 8601.
fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .or_else(|_| raw.parse::<NaiveDateTime>())
        .ok()
}

fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn mime_from_bytes(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}

/// A bare file name: no separators, no parent or root components.
fn is_plain_filename(filename: &str) -> bool {
    if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
        return false;
    }
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl ImageStore {
    pub fn new(images_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    async fn read_sessions(&self) -> Result<Vec<SessionMetadata>, ImageStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.metadata_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ImageStoreError::Io(e)),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with("sesion_") && name.ends_with(".json")) {
                continue;
            }

            let parsed = tokio::fs::read_to_string(entry.path())
                .await
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<SessionMetadata>(&raw).map_err(|e| e.to_string())
                });

            match parsed {
                Ok(session) => sessions.push(session),
                Err(error) => {
                    tracing::warn!(file = %name, %error, "Skipping unreadable session metadata")
                }
            }
        }
        Ok(sessions)
    }

    /// Successful images across all sessions, newest first, paginated.
    pub async fn list(&self, query: &ImageListQuery) -> Result<ImageListing, ImageStoreError> {
        let sessions = self.read_sessions().await?;

        let mut items: Vec<ImageListItem> = sessions
            .iter()
            .filter(|s| match &query.session_id {
                Some(wanted) => &s.session_id == wanted,
                None => true,
            })
            .flat_map(|session| {
                let product_name = session.product_name();
                let style = session.style();
                session
                    .imagenes
                    .iter()
                    .filter_map(|raw| serde_json::from_value::<SessionImage>(raw.clone()).ok())
                    .filter(|image| image.exito)
                    .map(move |image| {
                        let id = image_id(&session.session_id, image.variacion);
                        ImageListItem {
                            urls: ImageUrls::for_image(&image.nombre_archivo, &id),
                            id,
                            session_id: session.session_id.clone(),
                            product_name: product_name.clone(),
                            variation: image.variacion,
                            filename: image.nombre_archivo,
                            generation_timestamp: image.timestamp_generacion,
                            style: style.clone(),
                            dimensions: image.dimensiones,
                            file_size: image.tamano_archivo,
                        }
                    })
            })
            .collect();

        items.sort_by(|a, b| {
            parse_timestamp(b.generation_timestamp.as_deref())
                .cmp(&parse_timestamp(a.generation_timestamp.as_deref()))
        });

        let total_items = items.len();
        let start = (query.page - 1).saturating_mul(query.limit);
        let end = start.saturating_add(query.limit).min(total_items);
        let page_items: Vec<ImageListItem> = if start < total_items {
            items.drain(start..end).collect()
        } else {
            Vec::new()
        };

        Ok(ImageListing {
            images: page_items,
            pagination: Pagination {
                current_page: query.page,
                per_page: query.limit,
                total_items,
                total_pages: total_items.div_ceil(query.limit),
                has_next: end < total_items,
                has_prev: start > 0,
            },
            filters: ListFilters {
                session_id: query.session_id.clone(),
            },
        })
    }

    /// Metadata for one image id of the form `<8-char session>_<NN>`.
    pub async fn metadata(&self, image_id_param: &str) -> Result<ImageMetadataView, ImageStoreError> {
        let session_id = image_id_param.split('_').next().unwrap_or_default();
        if session_id.chars().count() != SESSION_ID_LEN
            || !session_id.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ImageStoreError::InvalidImageId(image_id_param.to_string()));
        }

        let path = self.metadata_dir.join(format!("sesion_{session_id}.json"));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ImageStoreError::MetadataNotFound(session_id.to_string()))?;
        let session: SessionMetadata = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt session metadata");
            ImageStoreError::MetadataNotFound(session_id.to_string())
        })?;

        let details = session
            .imagenes
            .iter()
            .find(|raw| {
                raw.get("variacion")
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
                    .map(|v| image_id(session_id, v) == image_id_param)
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| ImageStoreError::ImageMetadataNotFound(image_id_param.to_string()))?;

        Ok(ImageMetadataView {
            image_id: image_id_param.to_string(),
            session_id: session_id.to_string(),
            product: session.producto,
            generation_config: session.parametros,
            image_details: details,
            generation_timestamp: session.timestamp,
        })
    }

    /// Read one generated file, refusing anything outside the images directory.
    pub async fn read_image(&self, filename: &str) -> Result<StoredImage, ImageStoreError> {
        if !is_plain_filename(filename) {
            tracing::warn!(%filename, "Rejected image path outside images directory");
            return Err(ImageStoreError::AccessDenied);
        }

        let candidate = self.images_dir.join(filename);
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(_) => return Err(ImageStoreError::ImageNotFound(filename.to_string())),
        };
        let root = tokio::fs::canonicalize(&self.images_dir)
            .await
            .map_err(|_| ImageStoreError::ImageNotFound(filename.to_string()))?;
        if !resolved.starts_with(&root) {
            tracing::warn!(%filename, "Rejected image symlink escaping images directory");
            return Err(ImageStoreError::AccessDenied);
        }

        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|_| ImageStoreError::ImageNotFound(filename.to_string()))?;
        let mime_type = mime_from_extension(filename).unwrap_or_else(|| mime_from_bytes(&bytes));

        Ok(StoredImage {
            filename: filename.to_string(),
            bytes,
            mime_type,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("Invalid image id: {0}")]
    InvalidImageId(String),

    #[error("Metadata file not found for session {0}")]
    MetadataNotFound(String),

    #[error("No metadata for image {0}")]
    ImageMetadataNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Access to the requested file is denied")]
    AccessDenied,

    #[error("I/O error reading image store: {0}")]
    Io(#[from] std::io::Error),
}
