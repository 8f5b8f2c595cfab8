use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::models::field::{self, Field};
use crate::services::llm::Usage;

/// Keys recognised for each structured-comment field, in lookup order.
/// An empty value (`null`, `false`, `0` or blank text) falls through to the
/// next alias.
pub const RATING_ALIASES: &[&str] = &["calificacion", "rating", "score"];
pub const HELPFUL_ALIASES: &[&str] = &["util", "helpful", "votes"];
pub const BODY_ALIASES: &[&str] = &["comentario", "comment", "texto"];
pub const AUTHOR_ALIASES: &[&str] = &["usuario", "author", "user"];
pub const DATE_ALIASES: &[&str] = &["fecha_relativa", "relative_date"];

/// A customer comment: either free text or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Comment {
    Text(String),
    Structured(StructuredComment),
}

/// Structured comment with loosely-named fields, read through the alias lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredComment(pub Map<String, Value>);

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl StructuredComment {
    /// First alias holding a non-empty value.
    pub fn lookup(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !is_empty_value(value))
    }

    fn lookup_str(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    pub fn rating(&self) -> Option<&Value> {
        self.lookup(RATING_ALIASES)
    }

    pub fn helpful_votes(&self) -> Option<&Value> {
        self.lookup(HELPFUL_ALIASES)
    }

    pub fn body(&self) -> Option<&str> {
        self.lookup_str(BODY_ALIASES)
    }

    pub fn author(&self) -> Option<&str> {
        self.lookup_str(AUTHOR_ALIASES)
    }

    pub fn relative_date(&self) -> Option<&str> {
        self.lookup_str(DATE_ALIASES)
    }
}

impl Comment {
    /// One numbered line of the summarize prompt.
    pub fn prompt_line(&self, index: usize) -> String {
        match self {
            Comment::Text(text) => format!("{}. {}", index + 1, text.trim()),
            Comment::Structured(c) => {
                let rating = match c.rating() {
                    Some(Value::String(s)) => s.trim().to_string(),
                    Some(other) => other.to_string(),
                    None => "N/A".to_string(),
                };
                format!(
                    "{}. Usuario: {} | Calificación: {}/5 | Comentario: {}",
                    index + 1,
                    c.author().unwrap_or("Anónimo"),
                    rating,
                    c.body().unwrap_or("Sin comentario"),
                )
            }
        }
    }
}

/// Tone requested for generated comments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommentTone {
    Positive,
    Negative,
    Mixed,
}

impl CommentTone {
    pub fn instruction(self) -> &'static str {
        match self {
            CommentTone::Positive => {
                "Genera comentarios mayormente positivos (4-5 estrellas) con experiencias satisfactorias"
            }
            CommentTone::Negative => {
                "Genera comentarios mayormente negativos (1-2 estrellas) con críticas constructivas"
            }
            CommentTone::Mixed => {
                "Genera una mezcla realista de comentarios positivos, neutros y algunos negativos"
            }
        }
    }
}

/// POST /api/comments/generate body, as sent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateCommentsBody {
    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_name_rule))]
    pub product_name: Field<String>,

    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_description_rule))]
    pub product_description: Field<String>,

    #[garde(custom(comment_count_rule))]
    pub number_of_comments: Field<i64>,

    #[serde(deserialize_with = "field::text")]
    #[garde(custom(tone_rule))]
    pub sentiment: Field<String>,
}

const DEFAULT_COMMENTS: u32 = 5;

fn product_name_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    field::required_text(value, 2, 200)
}

fn product_description_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    field::required_text(value, 10, 1000)
}

fn comment_count_rule(value: &Field<i64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 1, 20)
}

fn tone_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    match field::optional(value)? {
        Some(tone) if tone.parse::<CommentTone>().is_err() => Err(garde::Error::new(
            "sentiment must be one of: positive, negative, mixed",
        )),
        _ => Ok(()),
    }
}

impl GenerateCommentsBody {
    /// Validate every field, then build the typed request.
    pub fn into_request(self) -> Result<GenerateCommentsRequest, garde::Report> {
        self.validate()?;
        Ok(GenerateCommentsRequest {
            product_name: self.product_name.into_present().unwrap_or_default(),
            product_description: self.product_description.into_present().unwrap_or_default(),
            number_of_comments: self
                .number_of_comments
                .into_present()
                .map_or(DEFAULT_COMMENTS, |n| n as u32),
            tone: self
                .sentiment
                .as_present()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CommentTone::Mixed),
        })
    }
}

/// A validated generate-comments request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCommentsRequest {
    pub product_name: String,
    pub product_description: String,
    pub number_of_comments: u32,
    pub tone: CommentTone,
}

/// POST /api/comments/summarize body, as sent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SummarizeCommentsBody {
    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_name_rule))]
    pub product_name: Field<String>,

    #[garde(custom(comments_rule))]
    pub comments: Field<Vec<Comment>>,
}

fn comments_rule(value: &Field<Vec<Comment>>, _ctx: &()) -> garde::Result {
    let comments = field::required(value)?;
    if comments.is_empty() {
        return Err(garde::Error::new("at least one comment is required"));
    }
    if comments.len() > 100 {
        return Err(garde::Error::new("at most 100 comments can be analyzed"));
    }

    let blank: Vec<String> = comments
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Comment::Text(t) if t.trim().is_empty()))
        .map(|(i, _)| i.to_string())
        .collect();
    if blank.is_empty() {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "text comments must not be empty (positions {})",
            blank.join(", ")
        )))
    }
}

impl SummarizeCommentsBody {
    /// Validate every field, then build the typed request.
    pub fn into_request(self) -> Result<SummarizeCommentsRequest, garde::Report> {
        self.validate()?;
        Ok(SummarizeCommentsRequest {
            product_name: self.product_name.into_present().unwrap_or_default(),
            comments: self.comments.into_present().unwrap_or_default(),
        })
    }
}

/// A validated summarize-comments request.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeCommentsRequest {
    pub product_name: String,
    pub comments: Vec<Comment>,
}

/// `data` of a successful generate-comments response.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedComments {
    pub product_name: String,
    pub product_description: String,
    pub comments: Vec<Value>,
    pub sentiment_type: CommentTone,
    pub total_comments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// `data` of a successful summarize-comments response.
#[derive(Debug, Clone, Serialize)]
pub struct CommentSummary {
    pub product_name: String,
    pub total_comments_analyzed: usize,
    pub summary: Map<String, Value>,
    pub analysis_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}
