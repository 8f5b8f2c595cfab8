use garde::Validate;
use serde_json::Value;

use crate::error::AppError;
use crate::models::description::{
    DescriptionBody, DescriptionProposal, DescriptionRequest, DescriptionResult,
};
use crate::services::extraction::extract_json;
use crate::services::llm::{ChatModel, ChatRequest};

const SYSTEM_PROMPT: &str = concat!(
    "Eres experto en marketing de productos y redacción comercial. ",
    "Debes responder ÚNICAMENTE con un array JSON válido. ",
    "Cada objeto debe tener exactamente las claves \"titulo\" y \"descripcion_comercial\". ",
    "No incluyas texto adicional, markdown, ni explicaciones. Solo el JSON."
);

const TEMPERATURE: f32 = 0.7;

fn user_prompt(request: &DescriptionRequest) -> String {
    let mut prompt = format!(
        "Genera {} propuestas de título comercial muy atractivo y descripción comercial para el producto \"{}\".",
        request.number_of_proposals, request.product_name
    );
    if let Some(info) = &request.product_aditional_info {
        prompt.push_str(&format!(" Además incluye esta información: {info}."));
    }
    prompt.push_str(" Cada propuesta debe tener un enfoque distinto.");
    prompt
}

/// Pull the proposal array out of the model's value, accepting a bare array
/// or one wrapped under `proposals`/`propuestas`.
fn proposal_entries(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["proposals", "propuestas"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

fn collect_proposals(entries: Vec<Value>) -> Vec<DescriptionProposal> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let proposal = serde_json::from_value::<DescriptionProposal>(entry)
                .map_err(|e| e.to_string())
                .and_then(|p| p.validate().map(|_| p).map_err(|r| r.to_string()));
            match proposal {
                Ok(p) => Some(p),
                Err(reason) => {
                    tracing::warn!(index, %reason, "Dropping malformed description proposal");
                    None
                }
            }
        })
        .collect()
}

/// Generate commercial title + description proposals for a product.
pub async fn generate_descriptions(
    llm: &dyn ChatModel,
    body: DescriptionBody,
) -> Result<DescriptionResult, AppError> {
    let request = body.into_request()?;

    let chat = ChatRequest::new(SYSTEM_PROMPT, user_prompt(&request)).temperature(TEMPERATURE);
    let completion = llm.complete(chat).await?;
    let value = extract_json(&completion.content)?;

    let entries = proposal_entries(value).ok_or_else(|| AppError::UpstreamParse {
        message: "El modelo no devolvió una lista de propuestas".to_string(),
        raw_output: completion.content.clone(),
    })?;

    let proposals = collect_proposals(entries);
    if proposals.is_empty() {
        return Err(AppError::UpstreamParse {
            message: "El modelo no devolvió ninguna propuesta válida".to_string(),
            raw_output: completion.content,
        });
    }

    metrics::counter!("descriptions_generated_total").increment(proposals.len() as u64);
    tracing::info!(
        product = %request.product_name,
        proposals = proposals.len(),
        "Product descriptions generated"
    );

    Ok(DescriptionResult {
        product_name: request.product_name,
        total_proposals: proposals.len(),
        proposals,
        usage: completion.usage,
    })
}
