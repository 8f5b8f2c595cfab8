use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::field::{self, Field};
use crate::models::trimmed;

/// POST /api/chat/generate-detailed-product-info body, as sent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct DescriptionBody {
    #[serde(deserialize_with = "field::text")]
    #[garde(custom(product_name_rule))]
    pub product_name: Field<String>,

    // Field name kept as the frontend sends it.
    #[serde(deserialize_with = "field::optional_text")]
    #[garde(custom(additional_info_rule))]
    pub product_aditional_info: Field<String>,

    #[garde(custom(proposals_rule))]
    pub number_of_proposals: Field<i64>,
}

fn product_name_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    field::required_text(value, 1, 200)
}

fn additional_info_rule(value: &Field<String>, _ctx: &()) -> garde::Result {
    match field::optional(value)? {
        Some(info) => field::check_length(info, 0, 1000),
        None => Ok(()),
    }
}

fn proposals_rule(value: &Field<i64>, _ctx: &()) -> garde::Result {
    field::optional_range(value, 1, 10)
}

impl DescriptionBody {
    /// Validate every field, then build the typed request.
    pub fn into_request(self) -> Result<DescriptionRequest, garde::Report> {
        self.validate()?;
        Ok(DescriptionRequest {
            product_name: self.product_name.into_present().unwrap_or_default(),
            product_aditional_info: self.product_aditional_info.into_present(),
            number_of_proposals: self
                .number_of_proposals
                .into_present()
                .map_or(DEFAULT_PROPOSALS, |n| n as u32),
        })
    }
}

const DEFAULT_PROPOSALS: u32 = 3;

/// A validated descriptions request.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionRequest {
    pub product_name: String,
    pub product_aditional_info: Option<String>,
    pub number_of_proposals: u32,
}

/// One commercial title + description pair produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct DescriptionProposal {
    #[serde(deserialize_with = "trimmed::string")]
    #[garde(length(min = 1))]
    pub titulo: String,

    #[serde(deserialize_with = "trimmed::string")]
    #[garde(length(min = 1))]
    pub descripcion_comercial: String,
}

/// `data` of a successful descriptions response.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptionResult {
    pub product_name: String,
    pub proposals: Vec<DescriptionProposal>,
    pub total_proposals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<crate::services::llm::Usage>,
}
