use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::models::comment::{
    CommentSummary, GenerateCommentsBody, GenerateCommentsRequest, GeneratedComments,
    SummarizeCommentsBody, SummarizeCommentsRequest,
};
use crate::services::comment_stats::{compute_stats, CommentStats};
use crate::services::extraction::extract_json;
use crate::services::llm::{ChatModel, ChatRequest};

const GENERATE_SYSTEM_PROMPT: &str = concat!(
    "Eres experto en generar comentarios realistas de clientes sobre productos. ",
    "Debes responder ÚNICAMENTE con un array JSON válido de comentarios. ",
    "Cada objeto debe tener las claves \"usuario\", \"calificacion\", \"comentario\", ",
    "\"fecha_relativa\", y \"util\". ",
    "No incluyas texto adicional, markdown, ni explicaciones. Solo el JSON."
);

const GENERATE_TEMPERATURE: f32 = 0.8;
const SUMMARIZE_TEMPERATURE: f32 = 0.3;

fn generate_user_prompt(request: &GenerateCommentsRequest) -> String {
    format!(
        "Genera {count} comentarios de clientes para el producto: \"{name}\". \
         Descripción: \"{description}\". {tone}. \
         Los comentarios deben ser variados, naturales y específicos del producto. \
         Incluye nombres de usuario realistas, calificaciones del 1 al 5, fechas relativas \
         como \"hace 2 días\", \"hace 1 semana\", etc., y un número de personas que \
         encontraron el comentario útil.",
        count = request.number_of_comments,
        name = request.product_name,
        description = request.product_description,
        tone = request.tone.instruction(),
    )
}

fn summarize_system_prompt(stats: &CommentStats) -> String {
    let ratings = match stats.average_rating {
        Some(avg) => format!(
            "La calificación promedio calculada es {avg}/5 basada en {} calificaciones.",
            stats.total_ratings
        ),
        None => "No se pudieron extraer calificaciones numéricas de los comentarios.".to_string(),
    };
    format!(
        "Eres experto en análisis de opiniones de clientes. Debes responder ÚNICAMENTE con un \
         objeto JSON válido que contenga las claves \"resumen_general\", \"aspectos_positivos\", \
         \"aspectos_negativos\", \"recomendacion_mejoras\" y \"sentiment_general\". {ratings} \
         No incluyas texto adicional, markdown, ni explicaciones. Solo el JSON."
    )
}

fn summarize_user_prompt(request: &SummarizeCommentsRequest, stats: &CommentStats) -> String {
    let lines: Vec<String> = request
        .comments
        .iter()
        .enumerate()
        .map(|(i, c)| c.prompt_line(i))
        .collect();
    let distribution = &stats.rating_distribution;
    let average = stats
        .average_rating
        .map(|a| a.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let sentiment = stats
        .sentiment
        .map(|s| s.to_string())
        .unwrap_or_else(|| "sin datos".to_string());

    format!(
        "Analiza y resume los siguientes comentarios del producto \"{name}\":\n\n\
         {comments}\n\n\
         Estadísticas calculadas:\n\
         - Total de comentarios: {total}\n\
         - Comentarios con calificación: {rated}\n\
         - Calificación promedio: {average}/5\n\
         - Distribución: 5⭐({d5}) 4⭐({d4}) 3⭐({d3}) 2⭐({d2}) 1⭐({d1})\n\
         - Sentimiento calculado: {sentiment}\n\n\
         Genera un resumen ejecutivo que incluya:\n\
         - Resumen general de las opiniones\n\
         - Aspectos más valorados positivamente (basándote en los comentarios)\n\
         - Aspectos más criticados (basándote en los comentarios)\n\
         - Recomendaciones para mejoras específicas\n\
         - Sentimiento general que coincida con las estadísticas calculadas",
        name = request.product_name,
        comments = lines.join("\n"),
        total = request.comments.len(),
        rated = stats.total_ratings,
        d5 = distribution.count(5),
        d4 = distribution.count(4),
        d3 = distribution.count(3),
        d2 = distribution.count(2),
        d1 = distribution.count(1),
    )
}

/// Accept a bare array or one wrapped under `comentarios`/`comments`.
fn comment_entries(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["comentarios", "comments"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

/// Overlay computed numbers on the model's summary. Computed values win
/// whenever they exist; the model's values remain as the fallback.
fn merge_summary(
    mut summary: Map<String, Value>,
    stats: &CommentStats,
    total_comments: usize,
) -> Map<String, Value> {
    if let Some(avg) = stats.average_rating {
        summary.insert("calificacion_promedio".to_string(), json!(avg));
    }
    if let Some(sentiment) = stats.sentiment {
        summary.insert("sentiment_general".to_string(), json!(sentiment));
    }
    summary.insert(
        "estadisticas_detalladas".to_string(),
        json!({
            "total_calificaciones": stats.total_ratings,
            "distribucion_calificaciones": stats.rating_distribution,
            "total_votos_utiles": stats.total_helpful_votes,
            "comentarios_con_calificacion": stats.total_ratings,
            "porcentaje_con_calificacion": stats.rated_percentage(total_comments),
        }),
    );
    summary
}

/// Generate realistic customer comments for a product.
pub async fn generate_comments(
    llm: &dyn ChatModel,
    body: GenerateCommentsBody,
) -> Result<GeneratedComments, AppError> {
    let request = body.into_request()?;

    let chat = ChatRequest::new(GENERATE_SYSTEM_PROMPT, generate_user_prompt(&request))
        .temperature(GENERATE_TEMPERATURE);
    let completion = llm.complete(chat).await?;
    let value = extract_json(&completion.content)?;

    let comments = comment_entries(value).ok_or_else(|| AppError::UpstreamParse {
        message: "El modelo no devolvió una lista de comentarios".to_string(),
        raw_output: completion.content.clone(),
    })?;

    metrics::counter!("comments_generated_total").increment(comments.len() as u64);
    tracing::info!(
        product = %request.product_name,
        requested = request.number_of_comments,
        generated = comments.len(),
        "Product comments generated"
    );

    Ok(GeneratedComments {
        sentiment_type: request.tone,
        product_name: request.product_name,
        product_description: request.product_description,
        total_comments: comments.len(),
        comments,
        usage: completion.usage,
    })
}

/// Summarize comments, cross-checking the model against computed statistics.
pub async fn summarize_comments(
    llm: &dyn ChatModel,
    body: SummarizeCommentsBody,
) -> Result<CommentSummary, AppError> {
    let request = body.into_request()?;

    let stats = compute_stats(&request.comments);
    tracing::debug!(
        average = ?stats.average_rating,
        rated = stats.total_ratings,
        sentiment = ?stats.sentiment,
        "Computed comment statistics"
    );

    let chat = ChatRequest::new(
        summarize_system_prompt(&stats),
        summarize_user_prompt(&request, &stats),
    )
    .temperature(SUMMARIZE_TEMPERATURE);
    let completion = llm.complete(chat).await?;

    let model_summary = match extract_json(&completion.content)? {
        Value::Object(map) => map,
        _ => {
            return Err(AppError::UpstreamParse {
                message: "El modelo no devolvió un objeto de resumen".to_string(),
                raw_output: completion.content,
            })
        }
    };

    let total = request.comments.len();
    let summary = merge_summary(model_summary, &stats, total);

    metrics::counter!("comment_summaries_total").increment(1);
    tracing::info!(
        product = %request.product_name,
        comments = total,
        "Comments summarized"
    );

    Ok(CommentSummary {
        product_name: request.product_name,
        total_comments_analyzed: total,
        summary,
        analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        usage: completion.usage,
    })
}
