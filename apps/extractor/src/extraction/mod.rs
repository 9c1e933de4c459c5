//! Extraction Client: turns sanitized page HTML into a validated `JobPostingsContainer`.
//!
//! One call is exactly one model invocation:
//! prompt + schema → provider → fence stripping → shape check → parse → validation pass.

pub mod prompts;
pub mod schema;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::cost::{ModelId, PricingTable};
use crate::extraction::prompts::{build_user_message, EXTRACTION_SYSTEM};
use crate::extraction::schema::job_postings_schema;
use crate::llm_client::{strip_json_fences, ChatProvider, ChatRequest, LlmError};
use crate::models::{JobPostingsContainer, SchemaError};

/// How much of an unexpected response is kept for the error message.
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unexpected response format: {preview}")]
    UnexpectedFormat { preview: String },

    #[error("response failed validation: {0}")]
    ValidationFailed(#[from] SchemaError),

    #[error("model provider call failed: {0}")]
    ProviderFailure(#[from] LlmError),

    #[error("no pricing configured for model '{0}'")]
    UnknownPricingModel(String),
}

pub struct ExtractionClient {
    provider: Arc<dyn ChatProvider>,
    pricing: Arc<PricingTable>,
    schema: Value,
}

impl ExtractionClient {
    pub fn new(provider: Arc<dyn ChatProvider>, pricing: Arc<PricingTable>) -> Self {
        Self {
            provider,
            pricing,
            schema: job_postings_schema(),
        }
    }

    /// Extracts job postings, resolving relative dates against today's local date.
    pub async fn extract(
        &self,
        html: &str,
        model: &ModelId,
    ) -> Result<JobPostingsContainer, ExtractionError> {
        self.extract_as_of(html, model, Local::now().date_naive())
            .await
    }

    pub async fn extract_as_of(
        &self,
        html: &str,
        model: &ModelId,
        today: NaiveDate,
    ) -> Result<JobPostingsContainer, ExtractionError> {
        self.pricing.get(model)?;

        let user = build_user_message(html);
        let response = self
            .provider
            .complete(ChatRequest {
                model: model.as_str(),
                system: EXTRACTION_SYSTEM,
                user: &user,
                schema: &self.schema,
            })
            .await?;

        let container = parse_response(&response, today)?;
        info!(
            "Extracted {} job posting(s) with {model}",
            container.job_postings.len()
        );
        Ok(container)
    }
}

/// Parses raw model output into validated records.
pub fn parse_response(
    response: &str,
    today: NaiveDate,
) -> Result<JobPostingsContainer, ExtractionError> {
    let body = strip_json_fences(response);
    if !body.starts_with('{') {
        warn!("Unexpected response format from model");
        return Err(ExtractionError::UnexpectedFormat {
            preview: body.chars().take(PREVIEW_CHARS).collect(),
        });
    }
    Ok(JobPostingsContainer::from_json(body, today)?)
}
