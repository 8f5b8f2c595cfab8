use garde::Validate;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::models::field::{self, Field};
use crate::models::trimmed;

/// Minimum similarity for suggesting a style to a caller who misspelled one.
const STYLE_SUGGESTION_THRESHOLD: f64 = 0.8;

/// Visual styles the generator script accepts for `--estilo`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageStyle {
    #[default]
    Profesional,
    Artistico,
    Minimalista,
    Natural,
    Premium,
    Divertido,
    Promocional,
    Banner,
    Catalogo,
    Instagram,
    Editorial,
    Ecommerce,
}

impl ImageStyle {
    pub fn display_name(self) -> &'static str {
        match self {
            ImageStyle::Profesional => "Profesional",
            ImageStyle::Artistico => "Artístico",
            ImageStyle::Minimalista => "Minimalista",
            ImageStyle::Natural => "Natural",
            ImageStyle::Premium => "Premium",
            ImageStyle::Divertido => "Divertido",
            ImageStyle::Promocional => "Promocional",
            ImageStyle::Banner => "Banner",
            ImageStyle::Catalogo => "Catálogo",
            ImageStyle::Instagram => "Instagram",
            ImageStyle::Editorial => "Editorial",
            ImageStyle::Ecommerce => "E-commerce",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ImageStyle::Profesional => {
                "Fotografía profesional de productos con iluminación de estudio"
            }
            ImageStyle::Artistico => "Composición artística y creativa con iluminación dramática",
            ImageStyle::Minimalista => "Composición simple y limpia con fondo blanco",
            ImageStyle::Natural => {
                "Fotografía natural con iluminación suave y materiales rústicos"
            }
            ImageStyle::Premium => "Presentación elegante y lujosa para productos de alta gama",
            ImageStyle::Divertido => {
                "Colores vibrantes y presentación alegre, atractiva para niños"
            }
            ImageStyle::Promocional => "Composición publicitaria con espacio para ofertas",
            ImageStyle::Banner => "Formato panorámico pensado para cabeceras web",
            ImageStyle::Catalogo => "Producto aislado y centrado, listo para catálogo",
            ImageStyle::Instagram => "Encuadre cuadrado con estética de redes sociales",
            ImageStyle::Editorial => "Fotografía de revista con ambientación cuidada",
            ImageStyle::Ecommerce => "Fondo neutro y detalle nítido para tiendas en línea",
        }
    }

    /// Closest known style to a misspelled one, if any is close enough.
    pub fn suggest(input: &str) -> Option<ImageStyle> {
        let input = input.to_lowercase();
        ImageStyle::iter()
            .map(|style| (style, jaro_winkler(&input, &style.to_string())))
            .filter(|(_, score)| *score >= STYLE_SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(style, _)| style)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleInfo {
    pub id: ImageStyle,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleCatalog {
    pub styles: Vec<StyleInfo>,
    pub default_style: ImageStyle,
}

impl StyleCatalog {
    pub fn all() -> Self {
        Self {
            styles: ImageStyle::iter()
                .map(|style| StyleInfo {
                    id: style,
                    name: style.display_name(),
                    description: style.description(),
                })
                .collect(),
            default_style: ImageStyle::default(),
        }
    }
}

/// POST /api/images/generate body, as sent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateImagesBody {
    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_name_rule))]
    pub product_name: Field<String>,

    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_description_rule))]
    pub product_description: Field<String>,

    #[serde(deserialize_with = "field::text")]
    #[garde(custom(known_style))]
    pub style: Field<String>,

    #[garde(custom(variations_rule))]
    pub variations: Field<i64>,

    #[garde(custom(dimension_rule))]
    pub width: Field<i64>,

    #[garde(custom(dimension_rule))]
    pub height: Field<i64>,

    #[garde(custom(inference_steps_rule))]
    pub inference_steps: Field<i64>,

    #[garde(custom(guidance_scale_rule))]
    pub guidance_scale: Field<f64>,
}

const DEFAULT_VARIATIONS: u32 = 3;
const DEFAULT_DIMENSION: u32 = 768;
const DEFAULT_INFERENCE_STEPS: u32 = 25;
const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;

fn product_name_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    field::required_text(value, 1, 100)
}

fn product_description_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    field::required_text(value, 10, 500)
}

fn variations_rule(value: &Field<i64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 1, 10)
}

fn dimension_rule(value: &Field<i64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 256, 2048)
}

fn inference_steps_rule(value: &Field<i64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 10, 100)
}

fn guidance_scale_rule(value: &Field<f64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 1.0, 20.0)
}

fn known_style(value: &Field<String>, _ctx: &()) -> garde::Result {
    let Some(value) = field::optional(value)? else {
        return Ok(());
    };
    if value.parse::<ImageStyle>().is_ok() {
        return Ok(());
    }
    let allowed: Vec<String> = ImageStyle::iter().map(|s| s.to_string()).collect();
    let message = match ImageStyle::suggest(value) {
        Some(s) => format!("unknown style '{value}', did you mean '{s}'?"),
        None => format!("style must be one of: {}", allowed.join(", ")),
    };
    Err(garde::Error::new(message))
}

fn count_or(value: Field<i64>, default: u32) -> u32 {
    value.into_present().map_or(default, |n| n as u32)
}

impl GenerateImagesBody {
    /// Validate every field, then build the typed request.
    pub fn into_request(self) -> Result<GenerateImagesRequest, garde::Report> {
        self.validate()?;
        Ok(GenerateImagesRequest {
            product_name: self.product_name.into_present().unwrap_or_default(),
            product_description: self.product_description.into_present().unwrap_or_default(),
            style: self
                .style
                .as_present()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            variations: count_or(self.variations, DEFAULT_VARIATIONS),
            width: count_or(self.width, DEFAULT_DIMENSION),
            height: count_or(self.height, DEFAULT_DIMENSION),
            inference_steps: count_or(self.inference_steps, DEFAULT_INFERENCE_STEPS),
            guidance_scale: self
                .guidance_scale
                .into_present()
                .unwrap_or(DEFAULT_GUIDANCE_SCALE),
        })
    }
}

/// A validated image generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateImagesRequest {
    pub product_name: String,
    pub product_description: String,
    pub style: ImageStyle,
    pub variations: u32,
    pub width: u32,
    pub height: u32,
    pub inference_steps: u32,
    pub guidance_scale: f64,
}

/// GET /api/images/list query string.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageListQuery {
    #[serde(default = "default_page")]
    #[garde(range(min = 1))]
    pub page: usize,

    #[serde(default = "default_limit")]
    #[garde(range(min = 1, max = 50))]
    pub limit: usize,

    #[serde(default, deserialize_with = "trimmed::optional")]
    #[garde(skip)]
    pub session_id: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    10
}

impl Default for ImageListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrls {
    pub serve: String,
    pub download: String,
    pub metadata: String,
}

impl ImageUrls {
    pub fn for_image(filename: &str, image_id: &str) -> Self {
        Self {
            serve: format!("/api/images/serve/{filename}"),
            download: format!("/api/images/download/{filename}"),
            metadata: format!("/api/images/metadata/{image_id}"),
        }
    }
}

/// How the generator handed back an image.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "format")]
pub enum ImagePayload {
    /// Encoded bytes returned on stdout, ready to drop into an `<img src>`.
    #[serde(rename = "base64")]
    Inline {
        data_url: String,
        mime_type: String,
        size_mb: f64,
    },
    /// Written to the images directory; fetched through the serve/download routes.
    #[serde(rename = "archivo")]
    File { urls: ImageUrls },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageMetadata {
    pub hash: String,
    pub size_bytes: u64,
    pub dimensions: Option<Dimensions>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedImage {
    pub id: String,
    pub variation: u32,
    pub filename: String,
    #[serde(flatten)]
    pub payload: ImagePayload,
    pub display_ready: bool,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub style: ImageStyle,
    pub variations_requested: u32,
    pub dimensions: Dimensions,
    pub inference_steps: u32,
    pub guidance_scale: f64,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatistics {
    pub total_generated: u32,
    pub total_failed: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationFiles {
    pub generation_timestamp: Option<String>,
    pub images_directory: Option<String>,
    pub metadata_file: Option<String>,
    pub format: String,
}

/// `data` of a successful image generation response.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationReport {
    pub session_id: String,
    pub product: ProductInfo,
    pub generation_config: GenerationConfig,
    pub statistics: GenerationStatistics,
    pub images: Vec<GeneratedImage>,
    pub metadata: GenerationFiles,
}

/// One row of GET /api/images/list.
#[derive(Debug, Clone, Serialize)]
pub struct ImageListItem {
    pub id: String,
    pub session_id: String,
    pub product_name: String,
    pub variation: u32,
    pub filename: String,
    pub generation_timestamp: Option<String>,
    pub style: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub file_size: Option<u64>,
    pub urls: ImageUrls,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub current_page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListFilters {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageListing {
    pub images: Vec<ImageListItem>,
    pub pagination: Pagination,
    pub filters: ListFilters,
}

/// Data of GET /api/images/metadata/{image_id}.
#[derive(Debug, Clone, Serialize)]
pub struct ImageMetadataView {
    pub image_id: String,
    pub session_id: String,
    pub product: serde_json::Value,
    pub generation_config: serde_json::Value,
    pub image_details: serde_json::Value,
    pub generation_timestamp: Option<String>,
}
