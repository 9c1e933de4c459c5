//! Axum route handlers for the scrape API.

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cost::ModelId;
use crate::errors::AppError;
use crate::pipeline::{parse_url_list, BatchReport};
use crate::renderer::validate_url;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    /// Newline-separated URLs, the same format as a URL file.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelEntry {
    pub model: ModelId,
    pub input_price_per_token: Decimal,
    pub output_price_per_token: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_model: ModelId,
    pub models: Vec<ModelEntry>,
}

/// POST /api/v1/scrape
///
/// Runs one batch and returns the per-URL report. Batches are serialized through the
/// pipeline lock, so a second request waits for the first to finish.
pub async fn handle_scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<BatchReport>, AppError> {
    let mut urls: Vec<String> = request
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if let Some(text) = &request.text {
        urls.extend(parse_url_list(text));
    }
    if urls.is_empty() {
        return Err(AppError::Validation(
            "provide at least one URL in 'urls' or 'text'".to_string(),
        ));
    }
    for url in &urls {
        validate_url(url).map_err(|e| AppError::Validation(e.to_string()))?;
    }

    let model = request
        .model
        .as_deref()
        .map(ModelId::from)
        .unwrap_or_else(|| state.config.default_model.clone());
    state.pricing.get(&model)?;

    info!("Scrape request: {} URL(s) with {model}", urls.len());
    let pipeline = state.pipeline.lock().await;
    let report = pipeline.run_batch(&urls, &model).await?;
    Ok(Json(report))
}

/// GET /api/v1/models
pub async fn handle_list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state
        .pricing
        .models()
        .map(|(model, pricing)| ModelEntry {
            model: model.clone(),
            input_price_per_token: pricing.input_price_per_token,
            output_price_per_token: pricing.output_price_per_token,
        })
        .collect();

    Json(ModelsResponse {
        default_model: state.config.default_model.clone(),
        models,
    })
}
